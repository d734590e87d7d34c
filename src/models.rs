//! Domain types shared by the crawler, the store and the CLI.

use serde::{Deserialize, Serialize};

/// A site registered for crawling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub title: String,
    pub root_url: String,
}

impl Site {
    pub fn new(title: impl Into<String>, root_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            root_url: root_url.into(),
        }
    }
}

/// A page produced by one successful render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// URL with the site's root prefix removed (`/` for the root itself)
    pub relative_path: String,
    pub title: String,
    pub content: String,
    pub noindex: bool,
}

/// Strip the site's root prefix from a crawled URL.
///
/// The prefix is the root URL with a trailing `/` ensured; the remainder keeps
/// its leading `/`. URLs outside the prefix are returned unchanged, except the
/// root itself which always maps to `/`.
pub fn relative_path(url: &str, root_url: &str) -> String {
    let prefix = if root_url.ends_with('/') {
        root_url.to_string()
    } else {
        format!("{}/", root_url)
    };

    if let Some(rest) = url.strip_prefix(prefix.as_str()) {
        format!("/{}", rest)
    } else if url.trim_end_matches('/') == root_url.trim_end_matches('/') {
        "/".to_string()
    } else {
        url.to_string()
    }
}
