//! Outbound link filtering
//!
//! Turns a rendered page's anchors into crawl candidates. Each step is a pure
//! filter, applied in order: nofollow, resolve, media, scope, fragment,
//! root twin, visited, robots.

use super::RobotsPolicy;
use crate::parse::Anchor;
use std::collections::HashSet;
use url::Url;

/// Path suffixes treated as images and never crawled
pub const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp", ".ico", ".tiff",
];

/// Origin plus path prefix that bounds a crawl
#[derive(Debug, Clone)]
pub struct CrawlScope {
    root: Url,
}

impl CrawlScope {
    pub fn new(root: Url) -> Self {
        Self { root }
    }

    /// Same origin and a path starting with the root's path
    pub fn contains(&self, url: &Url) -> bool {
        url.origin() == self.root.origin() && url.path().starts_with(self.root.path())
    }

    /// Fold `{root}/` onto a root without a trailing slash.
    ///
    /// Both address the same page, and both map to the relative path `/`.
    pub fn canonicalize(&self, url: Url) -> Url {
        let root = self.root.as_str();
        if !root.ends_with('/')
            && self.root.query().is_none()
            && url.as_str().strip_suffix('/') == Some(root)
        {
            self.root.clone()
        } else {
            url
        }
    }
}

/// Filters anchors down to in-scope, unvisited, robots-allowed URLs
pub struct LinkExtractor<'a> {
    scope: &'a CrawlScope,
    robots: &'a RobotsPolicy,
}

impl<'a> LinkExtractor<'a> {
    pub fn new(scope: &'a CrawlScope, robots: &'a RobotsPolicy) -> Self {
        Self { scope, robots }
    }

    /// Candidate URLs for the frontier; order is not meaningful
    pub fn extract(&self, anchors: &[Anchor], current: &Url, visited: &HashSet<Url>) -> Vec<Url> {
        anchors
            .iter()
            .filter(|anchor| !anchor.is_nofollow())
            .filter_map(|anchor| current.join(anchor.href.trim()).ok())
            .filter(|url| !is_image_url(url))
            .filter(|url| self.scope.contains(url))
            .map(strip_fragment)
            .map(|url| self.scope.canonicalize(url))
            .filter(|url| !visited.contains(url))
            .filter(|url| self.robots.is_allowed(url))
            .collect()
    }
}

/// Whether the URL path ends with a known image extension
pub fn is_image_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Drop `#...`; two URLs differing only by fragment are one crawl target
pub fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}
