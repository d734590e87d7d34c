//! Rendered page parsing and text extraction
//!
//! This module handles:
//! - Reader-mode text extraction from rendered HTML
//! - Page-level `noindex` detection
//! - Anchor extraction (`href` + `rel`) for link discovery

mod html;
mod text;

pub use html::*;
pub use text::*;

/// An anchor element as found in the rendered DOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw `href` attribute, unresolved
    pub href: String,

    /// Raw `rel` attribute, if any
    pub rel: Option<String>,
}

impl Anchor {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: None,
        }
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    /// Whether `rel` carries the `nofollow` token
    pub fn is_nofollow(&self) -> bool {
        self.rel.as_deref().is_some_and(|rel| {
            rel.split_whitespace()
                .any(|token| token.eq_ignore_ascii_case("nofollow"))
        })
    }
}

/// Text and indexing signal extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Reader-mode text, one trimmed non-empty line per line
    pub text: String,

    /// The page asked not to be indexed
    pub noindex: bool,
}

/// Everything the crawler needs from one rendered document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Document `<title>`, trimmed; empty if absent
    pub title: String,

    /// Every `a[href]`, nofollow included
    pub anchors: Vec<Anchor>,

    pub content: ExtractedContent,
}
