//! Button classification
//!
//! Decides whether an image candidate is an 88x31 button, fingerprints it by
//! content and stores it. Verdicts are remembered per image URL, in the
//! process cache and in storage, so an image is downloaded at most once.

use crate::analysis::analyze_image;
use crate::crawler::extract::ImageCandidate;
use crate::crawler::fetcher::Transport;
use crate::state::{CrawlCache, ImageVerdict};
use crate::storage::{with_storage, NewButton, SharedStorage};
use crate::TrawlerError;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::sync::Arc;

pub const BUTTON_WIDTH: u32 = 88;
pub const BUTTON_HEIGHT: u32 = 31;

/// What became of one image candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// A button; `is_new` when this call stored it
    Button { content_hash: String, is_new: bool },
    NotButton,
    /// The image could not be fetched
    Skipped,
}

impl ImageOutcome {
    pub fn content_hash(&self) -> Option<&str> {
        match self {
            Self::Button { content_hash, .. } => Some(content_hash),
            _ => None,
        }
    }
}

/// Hex SHA-256 of the image bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Reads width and height from the image header without decoding pixels
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

pub fn is_button_size(dimensions: (u32, u32)) -> bool {
    dimensions == (BUTTON_WIDTH, BUTTON_HEIGHT)
}

fn is_image_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => value.trim().to_ascii_lowercase().starts_with("image/"),
        None => true,
    }
}

/// Classifies image candidates for every site worker
pub struct ButtonClassifier {
    transport: Arc<dyn Transport>,
    storage: SharedStorage,
    cache: Arc<CrawlCache>,
}

impl ButtonClassifier {
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: SharedStorage,
        cache: Arc<CrawlCache>,
    ) -> Self {
        Self {
            transport,
            storage,
            cache,
        }
    }

    /// Classifies one candidate, storing it when it is a button not seen before
    ///
    /// # Order
    ///
    /// 1. Process cache verdict for the URL
    /// 2. Persisted verdict for the URL (warms the cache)
    /// 3. Download; failures are skipped and only cached for this process
    /// 4. Header dimensions must be exactly 88x31
    /// 5. Known content hash: no decode, no insert
    /// 6. Otherwise decode, analyze colors and insert
    ///
    /// # Errors
    ///
    /// Only storage failures are errors; everything else is an outcome.
    pub async fn classify(
        &self,
        candidate: &ImageCandidate,
    ) -> Result<ImageOutcome, TrawlerError> {
        let url = candidate.src.as_str();

        if let Some(verdict) = self.cache.image_verdict(url) {
            return Ok(known(verdict));
        }

        if let Some(verdict) = with_storage(&self.storage, |s| s.image_verdict(url))? {
            match &verdict {
                ImageVerdict::Button(hash) => self.cache.record_button(url, hash),
                ImageVerdict::NotButton => self.cache.record_not_button(url),
            }
            return Ok(known(verdict));
        }

        let fetched = match self.transport.fetch_bytes(&candidate.src).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::debug!("Skipping image {}: {}", url, e);
                self.cache.record_not_button(url);
                return Ok(ImageOutcome::Skipped);
            }
        };

        if !is_image_content_type(fetched.content_type.as_deref()) {
            tracing::debug!(
                "Not an image: {} ({})",
                url,
                fetched.content_type.as_deref().unwrap_or_default()
            );
            return self.not_button(url);
        }

        match image_dimensions(&fetched.bytes) {
            Some(dimensions) if is_button_size(dimensions) => {}
            Some((width, height)) => {
                tracing::trace!("Image {} is {}x{}, not a button", url, width, height);
                return self.not_button(url);
            }
            None => {
                tracing::debug!("Unreadable image header: {}", url);
                return self.not_button(url);
            }
        }

        let hash = content_hash(&fetched.bytes);
        let already_stored = self.cache.knows_hash(&hash)
            || with_storage(&self.storage, |s| s.has_button(&hash))?;

        let is_new = if already_stored {
            false
        } else {
            let decoded = match image::load_from_memory(&fetched.bytes) {
                Ok(decoded) => decoded.to_rgb8(),
                Err(e) => {
                    tracing::debug!("Failed to decode button {}: {}", url, e);
                    return self.not_button(url);
                }
            };
            let colors = analyze_image(&decoded);

            let button = NewButton {
                content_hash: hash.clone(),
                source_url: url.to_string(),
                links_to: candidate.links_to.as_ref().map(|u| u.to_string()),
                color_tags: colors.tags,
                average_color: colors.average_hex,
                alt_text: candidate.alt.clone(),
                image: fetched.bytes,
            };
            with_storage(&self.storage, |s| s.insert_button(&button))?
        };

        with_storage(&self.storage, |s| {
            s.record_image_verdict(url, &ImageVerdict::Button(hash.clone()))
        })?;
        self.cache.record_button(url, &hash);

        if is_new {
            tracing::info!("New button {} from {}", &hash[..12], url);
        }

        Ok(ImageOutcome::Button {
            content_hash: hash,
            is_new,
        })
    }

    fn not_button(&self, url: &str) -> Result<ImageOutcome, TrawlerError> {
        with_storage(&self.storage, |s| {
            s.record_image_verdict(url, &ImageVerdict::NotButton)
        })?;
        self.cache.record_not_button(url);
        Ok(ImageOutcome::NotButton)
    }
}

fn known(verdict: ImageVerdict) -> ImageOutcome {
    match verdict {
        ImageVerdict::Button(content_hash) => ImageOutcome::Button {
            content_hash,
            is_new: false,
        },
        ImageVerdict::NotButton => ImageOutcome::NotButton,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{FetchError, FetchResult, FetchedBytes, RobotsFetch};
    use crate::storage::{share, SqliteStorage};
    use async_trait::async_trait;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb(color));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    /// Serves fixed bytes per URL and counts downloads
    #[derive(Default)]
    struct ImageTransport {
        images: HashMap<String, (Vec<u8>, Option<&'static str>)>,
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl Transport for ImageTransport {
        async fn fetch_page(&self, _url: &Url) -> FetchResult {
            FetchResult::NetworkError {
                error: "unused".to_string(),
            }
        }

        async fn fetch_bytes(&self, url: &Url) -> Result<FetchedBytes, FetchError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            match self.images.get(url.as_str()) {
                Some((bytes, content_type)) => Ok(FetchedBytes {
                    bytes: bytes.clone(),
                    content_type: content_type.map(|c| c.to_string()),
                }),
                None => Err(FetchError::Status(404)),
            }
        }

        async fn fetch_robots_txt(&self, _origin: &Url, _max_size: usize) -> RobotsFetch {
            RobotsFetch::NotFound
        }
    }

    fn candidate(src: &str) -> ImageCandidate {
        ImageCandidate {
            src: Url::parse(src).unwrap(),
            links_to: Some(Url::parse("https://other.example/x").unwrap()),
            alt: Some("other".to_string()),
        }
    }

    type Fixture = (ButtonClassifier, Arc<ImageTransport>, SharedStorage);

    fn classifier(images: Vec<(&str, Vec<u8>, Option<&'static str>)>) -> Fixture {
        let transport = Arc::new(ImageTransport {
            images: images
                .into_iter()
                .map(|(url, bytes, ct)| (url.to_string(), (bytes, ct)))
                .collect(),
            downloads: AtomicUsize::new(0),
        });
        let storage = share(SqliteStorage::new_in_memory().unwrap());
        let classifier = ButtonClassifier::new(
            transport.clone(),
            storage.clone(),
            Arc::new(CrawlCache::new()),
        );
        (classifier, transport, storage)
    }

    #[test]
    fn test_image_dimensions_from_header() {
        assert_eq!(image_dimensions(&png(88, 31, [1, 2, 3])), Some((88, 31)));
        assert_eq!(image_dimensions(b"not an image"), None);
        assert!(is_button_size((88, 31)));
        assert!(!is_button_size((31, 88)));
        assert!(!is_button_size((88, 32)));
    }

    #[tokio::test]
    async fn test_new_button_is_stored() {
        let bytes = png(88, 31, [255, 0, 0]);
        let (classifier, _, storage) =
            classifier(vec![("https://site.example/b.png", bytes.clone(), Some("image/png"))]);

        let outcome = classifier
            .classify(&candidate("https://site.example/b.png"))
            .await
            .unwrap();
        let hash = content_hash(&bytes);
        assert_eq!(
            outcome,
            ImageOutcome::Button {
                content_hash: hash.clone(),
                is_new: true
            }
        );

        let stored = with_storage(&storage, |s| s.get_button(&hash)).unwrap().unwrap();
        assert_eq!(stored.color_tags, vec!["red"]);
        assert_eq!(stored.average_color, "#ff0000");
        assert_eq!(stored.links_to.as_deref(), Some("https://other.example/x"));
        assert_eq!(stored.alt_text.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_same_bytes_under_two_urls_is_one_button() {
        let bytes = png(88, 31, [0, 0, 255]);
        let (classifier, _, storage) = classifier(vec![
            ("https://a.example/one.png", bytes.clone(), Some("image/png")),
            ("https://b.example/two.png", bytes.clone(), None),
        ]);

        let first = classifier
            .classify(&candidate("https://a.example/one.png"))
            .await
            .unwrap();
        let second = classifier
            .classify(&candidate("https://b.example/two.png"))
            .await
            .unwrap();

        assert_eq!(first.content_hash(), second.content_hash());
        assert!(matches!(second, ImageOutcome::Button { is_new: false, .. }));
        assert_eq!(with_storage(&storage, |s| s.counts()).unwrap().buttons, 1);
    }

    #[tokio::test]
    async fn test_only_exact_size_is_a_button() {
        let (classifier, _, storage) = classifier(vec![
            ("https://a.example/big.png", png(88, 32, [0, 0, 0]), Some("image/png")),
            ("https://a.example/page", png(88, 31, [0, 0, 0]), Some("text/html")),
        ]);

        for src in ["https://a.example/big.png", "https://a.example/page"] {
            let outcome = classifier.classify(&candidate(src)).await.unwrap();
            assert_eq!(outcome, ImageOutcome::NotButton);
            assert_eq!(
                with_storage(&storage, |s| s.image_verdict(src)).unwrap(),
                Some(ImageVerdict::NotButton)
            );
        }
        assert_eq!(with_storage(&storage, |s| s.counts()).unwrap().buttons, 0);
    }

    #[tokio::test]
    async fn test_verdicts_avoid_second_download() {
        let (classifier, transport, _) = classifier(vec![(
            "https://a.example/b.png",
            png(88, 31, [0, 128, 0]),
            Some("image/png"),
        )]);

        for _ in 0..3 {
            classifier
                .classify(&candidate("https://a.example/b.png"))
                .await
                .unwrap();
        }
        let missing = classifier
            .classify(&candidate("https://a.example/missing.png"))
            .await
            .unwrap();
        classifier
            .classify(&candidate("https://a.example/missing.png"))
            .await
            .unwrap();

        assert_eq!(missing, ImageOutcome::Skipped);
        assert_eq!(transport.downloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persisted_verdict_is_reused() {
        let (classifier, transport, storage) = classifier(vec![]);
        with_storage(&storage, |s| {
            s.record_image_verdict(
                "https://a.example/known.gif",
                &ImageVerdict::Button("abc".to_string()),
            )
        })
        .unwrap();

        let outcome = classifier
            .classify(&candidate("https://a.example/known.gif"))
            .await
            .unwrap();
        assert_eq!(outcome.content_hash(), Some("abc"));
        assert_eq!(transport.downloads.load(Ordering::SeqCst), 0);
    }
}
