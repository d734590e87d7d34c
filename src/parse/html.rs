//! HTML parsing and reader-mode text extraction

use super::{normalize_lines, push_escaped, Anchor, ExtractedContent, ParsedPage};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

/// Elements that never carry article text
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
    "iframe", "svg", "button", "select", "textarea", "head", "title", "meta", "link",
];

/// Void elements worth keeping for layout; all other void elements are dropped
const LAYOUT_VOID_TAGS: &[&str] = &["br", "hr"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Candidate roots for the main content, in priority order
const MAIN_CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=main]", "body"];

/// Parse rendered HTML once and pull out title, anchors, text and `noindex`.
///
/// `robots_token` is the crawler's own product token; a `<meta>` with that
/// name counts as a robots directive alongside `<meta name="robots">`.
pub fn parse_page(content: &str, robots_token: &str) -> ParsedPage {
    let document = Html::parse_document(content);
    ParsedPage {
        title: extract_title(&document),
        anchors: extract_anchors(&document),
        content: ExtractedContent {
            text: extract_reader_text(&document),
            noindex: has_noindex_meta(&document, robots_token),
        },
    }
}

/// Reader-mode text: boilerplate stripped, main content kept, lines normalized.
///
/// Never fails; a document that yields nothing produces an empty string.
pub fn extract_reader_text(document: &Html) -> String {
    let mut cleaned = String::new();
    for root in main_content_roots(document) {
        write_clean_html(root, &mut cleaned);
    }
    if cleaned.trim().is_empty() {
        return String::new();
    }

    match html2text::from_read(cleaned.as_bytes(), 1000) {
        Ok(text) => normalize_lines(&text),
        Err(e) => {
            debug!("Text extraction failed: {}", e);
            String::new()
        }
    }
}

/// Whether a robots-family `<meta>` tag carries `noindex`
pub fn has_noindex_meta(document: &Html, robots_token: &str) -> bool {
    let selector = match Selector::parse("meta[name]") {
        Ok(s) => s,
        Err(_) => return false,
    };

    document.select(&selector).any(|el| {
        let name = el.value().attr("name").unwrap_or_default().trim();
        let is_robots_family = name.eq_ignore_ascii_case("robots")
            || (!robots_token.is_empty() && name.eq_ignore_ascii_case(robots_token));

        is_robots_family
            && el
                .value()
                .attr("content")
                .map(|c| c.to_ascii_lowercase().contains("noindex"))
                .unwrap_or(false)
    })
}

/// Every `a[href]` with its raw `href` and `rel`
pub fn extract_anchors(document: &Html) -> Vec<Anchor> {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            Some(Anchor {
                href: href.to_string(),
                rel: el.value().attr("rel").map(|r| r.to_string()),
            })
        })
        .collect()
}

/// Document `<title>`, trimmed
pub fn extract_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

/// Main content roots in document order.
///
/// Uses the first selector with any text-bearing match and keeps every
/// outermost match, so sibling articles on a listing page all survive.
fn main_content_roots(document: &Html) -> Vec<ElementRef<'_>> {
    for css in MAIN_CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        let matches: Vec<ElementRef<'_>> = document
            .select(&selector)
            .filter(|el| el.text().any(|t| !t.trim().is_empty()))
            .collect();
        if matches.is_empty() {
            continue;
        }

        let ids: Vec<_> = matches.iter().map(|el| el.id()).collect();
        return matches
            .into_iter()
            .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
            .collect();
    }
    vec![document.root_element()]
}

/// Re-serialize a subtree without boilerplate elements or attributes
fn write_clean_html(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if BOILERPLATE_TAGS.contains(&name) {
        return;
    }
    if VOID_TAGS.contains(&name) {
        if LAYOUT_VOID_TAGS.contains(&name) {
            out.push('<');
            out.push_str(name);
            out.push('>');
        }
        return;
    }

    out.push('<');
    out.push_str(name);
    out.push('>');

    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_escaped(out, text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_clean_html(child_el, out);
                }
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}
