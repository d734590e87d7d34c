//! Visited set and pending stack for a single crawl

use std::collections::HashSet;
use url::Url;

/// URLs discovered but not yet rendered, plus those already taken.
///
/// Pending URLs are popped last-in first-out, so the crawl explores depth
/// first. Owned by exactly one crawl invocation.
#[derive(Debug, Default)]
pub struct Frontier {
    visited: HashSet<Url>,
    pending: Vec<Url>,
    pending_set: HashSet<Url>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a URL unless it is visited or already pending.
    ///
    /// Returns whether the URL was added.
    pub fn push(&mut self, url: Url) -> bool {
        if self.visited.contains(&url) || self.pending_set.contains(&url) {
            return false;
        }
        self.pending_set.insert(url.clone());
        self.pending.push(url);
        true
    }

    /// Most recently pushed URL
    pub fn pop(&mut self) -> Option<Url> {
        let url = self.pending.pop()?;
        self.pending_set.remove(&url);
        Some(url)
    }

    /// Record a URL as taken. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.clone())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url)
    }

    pub fn visited(&self) -> &HashSet<Url> {
        &self.visited
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
