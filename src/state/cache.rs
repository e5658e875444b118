//! Process-wide deduplication cache
//!
//! Shared by every site worker through an `Arc`. It only saves work: the
//! persisted tables stay authoritative, so a race that lets two workers
//! download the same image just produces an idempotent duplicate write.

use dashmap::{DashMap, DashSet};

/// What is known about an image URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageVerdict {
    /// The URL serves a button with this content hash
    Button(String),
    /// The URL is not a button (wrong size, not an image, or unreachable)
    NotButton,
}

/// Image-URL verdicts and known button hashes
#[derive(Debug, Default)]
pub struct CrawlCache {
    images: DashMap<String, ImageVerdict>,
    hashes: DashSet<String>,
}

impl CrawlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_verdict(&self, url: &str) -> Option<ImageVerdict> {
        self.images.get(url).map(|entry| entry.value().clone())
    }

    pub fn record_button(&self, url: &str, content_hash: &str) {
        self.images
            .insert(url.to_string(), ImageVerdict::Button(content_hash.to_string()));
        self.hashes.insert(content_hash.to_string());
    }

    pub fn record_not_button(&self, url: &str) {
        self.images.insert(url.to_string(), ImageVerdict::NotButton);
    }

    pub fn knows_hash(&self, content_hash: &str) -> bool {
        self.hashes.contains(content_hash)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_verdicts() {
        let cache = CrawlCache::new();
        assert_eq!(cache.image_verdict("https://a.example/b.gif"), None);

        cache.record_button("https://a.example/b.gif", "abc123");
        cache.record_not_button("https://a.example/banner.png");

        assert_eq!(
            cache.image_verdict("https://a.example/b.gif"),
            Some(ImageVerdict::Button("abc123".to_string()))
        );
        assert_eq!(
            cache.image_verdict("https://a.example/banner.png"),
            Some(ImageVerdict::NotButton)
        );
        assert!(cache.knows_hash("abc123"));
        assert_eq!(cache.image_count(), 2);
    }

    #[test]
    fn test_shared_between_threads() {
        let cache = Arc::new(CrawlCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.record_button(&format!("https://a.example/{}.gif", i), "same-hash");
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.image_count(), 4);
        assert!(cache.knows_hash("same-hash"));
    }
}
