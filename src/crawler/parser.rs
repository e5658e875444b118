//! HTML parser for extracting images, links and page text
//!
//! This module walks raw markup and extracts:
//! - Every `<img>` with its source, alt text and enclosing anchor
//! - Links to follow (from `<a>` tags)
//! - Page title and description
//! - Visible body text
//!
//! Nothing is resolved here: hrefs and sources are returned exactly as
//! written and canonicalized later against the page URL.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="description"][content]"#).expect("valid selector")
});
static OG_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:description"][content]"#).expect("valid selector")
});

/// Elements whose text never counts as page text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// An image as written in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub src: String,
    /// `href` of the nearest enclosing `<a>`
    pub links_to: Option<String>,
    pub alt: Option<String>,
}

/// A link as written in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub text: Option<String>,
}

/// Everything extracted from one HTML document
#[derive(Debug, Clone, Default)]
pub struct ParsedMarkup {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub images: Vec<RawImage>,
    pub links: Vec<RawLink>,
}

/// Parses HTML content and extracts images, links and metadata
///
/// # Extraction Rules
///
/// - Image source: `src`, then `data-src`, then the first `srcset` candidate
/// - `<a href="..." download>` links are skipped
/// - Description: `<meta name="description">`, then `og:description`
/// - Text inside `script`, `style` and `noscript` is ignored
///
/// # Example
///
/// ```
/// use button_trawler::crawler::parse_markup;
///
/// let html = r#"<html><head><title>Test</title></head>
///     <body><a href="/friends"><img src="/b.gif" alt="friend"></a></body></html>"#;
/// let parsed = parse_markup(html);
/// assert_eq!(parsed.title.as_deref(), Some("Test"));
/// assert_eq!(parsed.images[0].links_to.as_deref(), Some("/friends"));
/// ```
pub fn parse_markup(html: &str) -> ParsedMarkup {
    let document = Html::parse_document(html);

    ParsedMarkup {
        title: extract_title(&document),
        description: extract_description(&document),
        text: extract_text(&document),
        images: extract_images(&document),
        links: extract_links(&document),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE)
        .next()
        .and_then(|element| non_empty(&element.text().collect::<String>()))
}

fn extract_description(document: &Html) -> Option<String> {
    [&*META_DESCRIPTION, &*OG_DESCRIPTION]
        .into_iter()
        .find_map(|selector| {
            document
                .select(selector)
                .filter_map(|meta| meta.value().attr("content"))
                .find_map(non_empty)
        })
}

fn image_source(element: &ElementRef<'_>) -> Option<String> {
    let attrs = element.value();
    attrs
        .attr("src")
        .and_then(non_empty)
        .or_else(|| attrs.attr("data-src").and_then(non_empty))
        .or_else(|| {
            attrs
                .attr("srcset")
                .and_then(|srcset| srcset.split(',').next())
                .and_then(|candidate| candidate.split_whitespace().next())
                .and_then(non_empty)
        })
}

fn enclosing_anchor_href(element: &ElementRef<'_>) -> Option<String> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(non_empty)
}

fn extract_images(document: &Html) -> Vec<RawImage> {
    document
        .select(&IMG)
        .filter_map(|element| {
            let src = image_source(&element)?;
            Some(RawImage {
                src,
                links_to: enclosing_anchor_href(&element),
                alt: element.value().attr("alt").and_then(non_empty),
            })
        })
        .collect()
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html) -> Vec<RawLink> {
    document
        .select(&ANCHOR)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| {
            let href = element.value().attr("href").and_then(non_empty)?;
            Some(RawLink {
                href,
                text: non_empty(&element.text().collect::<Vec<_>>().join(" ")),
            })
        })
        .collect()
}

/// Collects visible text, one space between text nodes
fn extract_text(document: &Html) -> String {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        let text = text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
    }

    parts.join(" ")
}
