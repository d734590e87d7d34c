//! Default values for configuration

use super::{FailurePolicy, RendererKind};

/// User-Agent presented on every outbound request
pub fn default_crawl_user_agent() -> String {
    "watch-duty-crawler/0.1 (+https://github.com/chao7150/watch-duty-crawler)".to_string()
}

/// Delay inserted before every navigation (milliseconds)
pub fn default_request_delay() -> u64 {
    2000
}

/// Ceiling on a single page navigation (milliseconds)
pub fn default_navigation_timeout() -> u64 {
    10_000
}

/// Timeout for the robots.txt request (seconds)
pub fn default_robots_timeout() -> u64 {
    10
}

/// Default: respect robots.txt
pub fn default_respect_robots() -> bool {
    true
}

/// Headless browser when compiled in, plain HTTP otherwise
pub fn default_renderer() -> RendererKind {
    if cfg!(feature = "js-rendering") {
        RendererKind::Browser
    } else {
        RendererKind::Http
    }
}

/// Settle time after the load event when network idle cannot be observed
pub fn default_js_render_wait() -> u64 {
    500
}

pub fn default_failure_policy() -> FailurePolicy {
    FailurePolicy::FailFast
}
