//! robots.txt fetching and matching

use reqwest::Client;
use robotstxt::DefaultMatcher;
use tracing::{debug, warn};
use url::Url;

/// Parsed robots.txt rules for one origin, bound to this crawler's agent.
///
/// Lives for a single crawl; never cached across crawls.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    content: String,
    user_agent: String,
}

impl RobotsPolicy {
    /// Parse robots.txt content for the given product token
    pub fn parse(content: &str, user_agent: &str) -> Self {
        Self {
            content: content.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Create a policy that allows everything
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            user_agent: String::new(),
        }
    }

    /// Fetch `{origin}/robots.txt` once.
    ///
    /// Any failure (transport, non-success status, unreadable body) degrades
    /// to allow-all.
    pub async fn load(client: &Client, root: &Url, user_agent: &str) -> Self {
        let robots_url = format!("{}/robots.txt", root.origin().ascii_serialization());
        debug!("Fetching robots.txt from {}", robots_url);

        let response = match client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(
                    "robots.txt returned {} for {}, allowing all",
                    response.status(),
                    robots_url
                );
                return Self::allow_all();
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}; allowing all", robots_url, e);
                return Self::allow_all();
            }
        };

        match response.text().await {
            Ok(text) => Self::parse(&text, user_agent),
            Err(e) => {
                warn!("Failed to read {}: {}; allowing all", robots_url, e);
                Self::allow_all()
            }
        }
    }

    /// Check if a URL is allowed for this crawler's agent
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        let allowed =
            matcher.one_agent_allowed_by_robots(&self.content, &self.user_agent, url.as_str());

        if !allowed {
            debug!("robots.txt disallows {} for {}", url, self.user_agent);
        }

        allowed
    }

    /// Crawl delay in seconds, preferring this agent's group over the wildcard
    pub fn crawl_delay(&self) -> Option<f64> {
        let ua_lower = self.user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut default_delay: Option<f64> = None;
        let mut specific_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if !in_agent_lines {
                    group_agents.clear();
                }
                group_agents.push(value.to_lowercase());
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if key == "crawl-delay" {
                if let Ok(delay) = value.parse::<f64>() {
                    if group_agents.iter().any(|a| a == &ua_lower) {
                        specific_delay = Some(delay);
                    } else if group_agents.iter().any(|a| a == "*") {
                        default_delay = Some(delay);
                    }
                }
            }
        }

        specific_delay.or(default_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AGENT: &str = "watch-duty-crawler";

    const ROBOTS: &str = "User-agent: Googlebot\nDisallow: /googlebotForbidden\nUser-agent: watch-duty-crawler\nDisallow: /wdcForbidden\nDisallow: /forbidden\nUser-agent: *\nDisallow: /forbidden";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_robots_allow_all() {
        let rules = RobotsPolicy::allow_all();
        assert!(rules.is_allowed(&url("http://host/any/path")));
    }

    #[test]
    fn test_own_agent_rules_apply() {
        let rules = RobotsPolicy::parse(ROBOTS, AGENT);

        assert!(!rules.is_allowed(&url("http://host/forbidden")));
        assert!(!rules.is_allowed(&url("http://host/wdcForbidden")));
        assert!(rules.is_allowed(&url("http://host/href")));
        assert!(rules.is_allowed(&url("http://host/")));
    }

    #[test]
    fn test_other_agent_rules_ignored() {
        let rules = RobotsPolicy::parse(ROBOTS, AGENT);
        assert!(rules.is_allowed(&url("http://host/googlebotForbidden")));
    }

    #[test]
    fn test_wildcard_applies_without_own_group() {
        let content = "User-agent: *\nDisallow: /admin/\n\nUser-agent: BadBot\nDisallow: /\n";
        let rules = RobotsPolicy::parse(content, AGENT);

        assert!(rules.is_allowed(&url("http://host/public/page")));
        assert!(!rules.is_allowed(&url("http://host/admin/secret")));
    }

    #[test]
    fn test_crawl_delay() {
        let content = r#"
User-agent: *
Crawl-delay: 2.5

User-agent: watch-duty-crawler
Crawl-delay: 4
"#;
        let rules = RobotsPolicy::parse(content, AGENT);
        assert_eq!(rules.crawl_delay(), Some(4.0));

        let other = RobotsPolicy::parse(content, "otherbot");
        assert_eq!(other.crawl_delay(), Some(2.5));

        assert_eq!(RobotsPolicy::allow_all().crawl_delay(), None);
    }

    #[tokio::test]
    async fn test_load_fetches_from_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ROBOTS))
            .expect(1)
            .mount(&server)
            .await;

        let root = url(&format!("{}/docs/", server.uri()));
        let rules = RobotsPolicy::load(&Client::new(), &root, AGENT).await;

        let forbidden = url(&format!("{}/forbidden", server.uri()));
        assert!(!rules.is_allowed(&forbidden));
    }

    #[tokio::test]
    async fn test_load_missing_file_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404).set_body_string("User-agent: *\nDisallow: /"))
            .mount(&server)
            .await;

        let root = url(&server.uri());
        let rules = RobotsPolicy::load(&Client::new(), &root, AGENT).await;
        assert!(rules.is_allowed(&url(&format!("{}/anything", server.uri()))));
    }

    #[tokio::test]
    async fn test_load_unreachable_allows_all() {
        // Port 9 (discard) is not expected to serve HTTP
        let root = url("http://127.0.0.1:9/");
        let rules = RobotsPolicy::load(&Client::new(), &root, AGENT).await;
        assert!(rules.is_allowed(&url("http://127.0.0.1:9/private")));
    }
}
