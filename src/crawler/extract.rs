//! Page sources and extraction
//!
//! A [`PageSource`] turns a URL into a [`RawPage`], either by parsing markup
//! fetched through the transport or by asking the render worker. [`reconcile`]
//! then resolves everything in the raw page against the page URL.

use crate::crawler::fetcher::{FetchResult, Transport};
use crate::crawler::parser::{parse_markup, RawImage, RawLink};
use crate::url::{canonicalize, same_site, site_key, Blocklist, LinkVerdict};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Why a page could not be loaded
#[derive(Debug, Error)]
pub enum SourceError {
    /// 403, or the render worker refused the page
    #[error("Forbidden")]
    Forbidden,

    /// 404 / 410
    #[error("Page does not exist")]
    Absent,

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Not an HTML page: {0}")]
    NotHtml(String),
}

/// A loaded page before canonicalization
#[derive(Debug, Clone)]
pub struct RawPage {
    pub final_url: Url,
    pub status_code: u16,
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub images: Vec<RawImage>,
    pub links: Vec<RawLink>,
}

/// Loads a page's content
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, url: &Url) -> Result<RawPage, SourceError>;
}

/// Fetches markup through the transport and parses it
pub struct MarkupSource {
    transport: Arc<dyn Transport>,
}

impl MarkupSource {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
}

#[async_trait]
impl PageSource for MarkupSource {
    async fn load(&self, url: &Url) -> Result<RawPage, SourceError> {
        match self.transport.fetch_page(url).await {
            FetchResult::Success {
                final_url,
                status_code,
                content_type,
                body,
            } => {
                if !is_html(&content_type) {
                    return Err(SourceError::NotHtml(content_type));
                }

                let parsed = parse_markup(&body);
                Ok(RawPage {
                    final_url,
                    status_code,
                    title: parsed.title,
                    description: parsed.description,
                    text: parsed.text,
                    images: parsed.images,
                    links: parsed.links,
                })
            }
            FetchResult::HttpError { status_code, .. } => Err(match status_code {
                403 => SourceError::Forbidden,
                404 | 410 => SourceError::Absent,
                other => SourceError::Status(other),
            }),
            FetchResult::NetworkError { error } => Err(SourceError::Network(error)),
        }
    }
}

/// Tries the primary source and falls back to the secondary one
///
/// `Forbidden` and `Absent` from the primary are final; any other
/// failure triggers the fallback.
pub struct FallbackSource {
    primary: Box<dyn PageSource>,
    fallback: Box<dyn PageSource>,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn PageSource>, fallback: Box<dyn PageSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PageSource for FallbackSource {
    async fn load(&self, url: &Url) -> Result<RawPage, SourceError> {
        match self.primary.load(url).await {
            Ok(page) => Ok(page),
            Err(error @ (SourceError::Forbidden | SourceError::Absent)) => Err(error),
            Err(error) => {
                tracing::debug!("Primary source failed for {}: {}; using markup", url, error);
                self.fallback.load(url).await
            }
        }
    }
}

/// An image worth checking, resolved against its page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub src: Url,
    /// Only set when the enclosing anchor points at another, unblocked site
    pub links_to: Option<Url>,
    pub alt: Option<String>,
}

/// A raw page after canonicalization and blocklist filtering
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub images: Vec<ImageCandidate>,
    /// Canonical links on the page's own site, in document order
    pub same_host_links: Vec<Url>,
    /// Canonical root URLs of other sites referenced by the page
    pub external_sites: Vec<Url>,
}

/// Root URL of the site `url` belongs to
fn site_root(url: &Url) -> Option<Url> {
    let mut root = url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    (!root.cannot_be_a_base()).then_some(root)
}

#[derive(Default)]
struct ExternalSites {
    seen: HashSet<String>,
    roots: Vec<Url>,
}

impl ExternalSites {
    /// Records the site of `url` unless its root itself is filtered
    fn add(&mut self, url: &Url, blocklist: &Blocklist) {
        if let (Some(key), Some(root)) = (site_key(url), site_root(url)) {
            if blocklist.classify(&root) == LinkVerdict::Allow && self.seen.insert(key) {
                self.roots.push(root);
            }
        }
    }
}

/// Resolves a raw page against `page_url` and applies the blocklist
///
/// Images and same-site links are deduplicated by canonical URL and keep
/// their first-seen order. Asset URLs are dropped, though the site they live
/// on is still reported when external and its root is not an asset host.
/// Blocked URLs are dropped entirely.
pub fn reconcile(page_url: &Url, raw: &RawPage, blocklist: &Blocklist) -> PageExtraction {
    let mut external = ExternalSites::default();
    let mut images = Vec::new();
    let mut seen_images = HashSet::new();

    for image in &raw.images {
        let Some(src) = canonicalize(page_url, &image.src) else {
            continue;
        };
        if blocklist.classify(&src) != LinkVerdict::Allow {
            continue;
        }
        if !seen_images.insert(src.to_string()) {
            continue;
        }

        let links_to = image
            .links_to
            .as_deref()
            .and_then(|href| canonicalize(page_url, href))
            .filter(|target| !same_site(target, page_url))
            .filter(|target| blocklist.classify(target) != LinkVerdict::Blocked);
        if let Some(target) = &links_to {
            external.add(target, blocklist);
        }

        images.push(ImageCandidate {
            src,
            links_to,
            alt: image.alt.clone(),
        });
    }

    let mut same_host_links = Vec::new();
    let mut seen_links = HashSet::new();

    for link in &raw.links {
        let Some(target) = canonicalize(page_url, &link.href) else {
            continue;
        };

        match blocklist.classify(&target) {
            LinkVerdict::Blocked => continue,
            verdict if same_site(&target, page_url) => {
                if verdict == LinkVerdict::Allow && seen_links.insert(target.to_string()) {
                    same_host_links.push(target);
                }
            }
            _ => external.add(&target, blocklist),
        }
    }

    PageExtraction {
        title: raw.title.clone(),
        description: raw.description.clone(),
        text: raw.text.clone(),
        images,
        same_host_links,
        external_sites: external.roots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{FetchError, FetchedBytes, RobotsFetch};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page_url() -> Url {
        Url::parse("https://site.example/links/").unwrap()
    }

    fn raw(images: Vec<RawImage>, links: Vec<&str>) -> RawPage {
        RawPage {
            final_url: page_url(),
            status_code: 200,
            title: Some("Links".to_string()),
            description: None,
            text: "some text".to_string(),
            images,
            links: links
                .into_iter()
                .map(|href| RawLink {
                    href: href.to_string(),
                    text: None,
                })
                .collect(),
        }
    }

    fn image(src: &str, links_to: Option<&str>) -> RawImage {
        RawImage {
            src: src.to_string(),
            links_to: links_to.map(|s| s.to_string()),
            alt: None,
        }
    }

    #[test]
    fn test_wrapped_button_links_to_other_site() {
        let extraction = reconcile(
            &page_url(),
            &raw(vec![image("/b.gif", Some("https://other.example/x"))], vec![]),
            &Blocklist::default(),
        );

        assert_eq!(extraction.images.len(), 1);
        assert_eq!(
            extraction.images[0].src.as_str(),
            "https://site.example/b.gif"
        );
        assert_eq!(
            extraction.images[0].links_to.as_ref().map(|u| u.as_str()),
            Some("https://other.example/x")
        );
        assert_eq!(
            extraction.external_sites,
            vec![Url::parse("https://other.example/").unwrap()]
        );
    }

    #[test]
    fn test_same_site_anchor_is_not_links_to() {
        let extraction = reconcile(
            &page_url(),
            &raw(vec![image("b.gif", Some("/about"))], vec![]),
            &Blocklist::default(),
        );
        assert_eq!(
            extraction.images[0].src.as_str(),
            "https://site.example/links/b.gif"
        );
        assert_eq!(extraction.images[0].links_to, None);
    }

    #[test]
    fn test_images_deduplicated_and_filtered() {
        let extraction = reconcile(
            &page_url(),
            &raw(
                vec![
                    image("/b.gif", None),
                    image("https://site.example/b.gif#x", None),
                    image("https://cdn.site.example/c.gif", None),
                    image("data:image/gif;base64,AAAA", None),
                ],
                vec![],
            ),
            &Blocklist::default(),
        );
        assert_eq!(extraction.images.len(), 1);
    }

    #[test]
    fn test_links_partitioned() {
        let extraction = reconcile(
            &page_url(),
            &raw(
                vec![],
                vec![
                    "/a",
                    "/a#top",
                    "/b/",
                    "https://friend.example/page",
                    "https://friend.example/other",
                    "https://cdn.friend.example/lib.js",
                    "https://github.com/someone",
                    "/cdn-cgi/l/email-protection",
                    "mailto:me@site.example",
                ],
            ),
            &Blocklist::default(),
        );

        let links: Vec<_> = extraction
            .same_host_links
            .iter()
            .map(|u| u.as_str())
            .collect();
        assert_eq!(links, vec!["https://site.example/a", "https://site.example/b"]);
        assert_eq!(
            extraction.external_sites,
            vec![Url::parse("https://friend.example/").unwrap()]
        );
    }

    struct CountingSource {
        calls: AtomicUsize,
        result: fn() -> Result<RawPage, SourceError>,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn load(&self, _url: &Url) -> Result<RawPage, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn ok_page() -> Result<RawPage, SourceError> {
        Ok(raw(vec![], vec!["/from-markup"]))
    }

    #[tokio::test]
    async fn test_fallback_on_decode_error() {
        let primary = CountingSource {
            calls: AtomicUsize::new(0),
            result: || Err(SourceError::Decode("bad json".to_string())),
        };
        let fallback = CountingSource {
            calls: AtomicUsize::new(0),
            result: ok_page,
        };
        let source = FallbackSource::new(Box::new(primary), Box::new(fallback));

        let page = source.load(&page_url()).await.unwrap();
        assert_eq!(page.links[0].href, "/from-markup");
    }

    #[tokio::test]
    async fn test_no_fallback_when_forbidden() {
        let source = FallbackSource::new(
            Box::new(CountingSource {
                calls: AtomicUsize::new(0),
                result: || Err(SourceError::Forbidden),
            }),
            Box::new(CountingSource {
                calls: AtomicUsize::new(0),
                result: ok_page,
            }),
        );

        assert!(matches!(
            source.load(&page_url()).await,
            Err(SourceError::Forbidden)
        ));
    }

    struct StaticTransport {
        content_type: &'static str,
        body: &'static str,
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn fetch_page(&self, url: &Url) -> FetchResult {
            FetchResult::Success {
                final_url: url.clone(),
                status_code: 200,
                content_type: self.content_type.to_string(),
                body: self.body.to_string(),
            }
        }

        async fn fetch_bytes(&self, _url: &Url) -> Result<FetchedBytes, FetchError> {
            Err(FetchError::Status(404))
        }

        async fn fetch_robots_txt(&self, _origin: &Url, _max_size: usize) -> RobotsFetch {
            RobotsFetch::NotFound
        }
    }

    #[tokio::test]
    async fn test_markup_source_rejects_non_html() {
        let source = MarkupSource::new(Arc::new(StaticTransport {
            content_type: "application/pdf",
            body: "%PDF",
        }));
        assert!(matches!(
            source.load(&page_url()).await,
            Err(SourceError::NotHtml(_))
        ));

        let source = MarkupSource::new(Arc::new(StaticTransport {
            content_type: "text/html; charset=utf-8",
            body: "<title>Hi</title>",
        }));
        let page = source.load(&page_url()).await.unwrap();
        assert_eq!(page.title.as_deref(), Some("Hi"));
    }
}
