//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::robots::RobotsState;
use crate::state::{ImageVerdict, PageState};
use crate::storage::{
    ButtonRecord, ButtonSighting, NewButton, PageRecord, StorageCounts, WebsiteRecord,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Website not found: {0}")]
    WebsiteNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes keyed by a unique value (hostname, content key, content hash,
/// image URL) are idempotent: inserting an existing key succeeds and
/// changes nothing. Methods returning `bool` report whether a row was
/// actually created.
pub trait Storage {
    // ===== Websites =====

    /// Inserts a website if its hostname is new and returns its ID
    fn ensure_website(&mut self, hostname: &str, root_url: &str) -> StorageResult<i64>;

    fn get_website(&self, hostname: &str) -> StorageResult<Option<WebsiteRecord>>;

    /// Websites not yet scraped, oldest first
    fn pending_websites(&self, limit: usize) -> StorageResult<Vec<WebsiteRecord>>;

    fn mark_website_scraped(&mut self, hostname: &str) -> StorageResult<()>;

    /// Puts a website back into the pending set
    fn reset_website(&mut self, hostname: &str) -> StorageResult<()>;

    /// Persists the robots.txt outcome for a website
    fn save_robots_state(&mut self, hostname: &str, state: &RobotsState) -> StorageResult<()>;

    // ===== Pages =====

    fn is_page_recorded(&self, content_key: &str) -> StorageResult<bool>;

    /// Records a page under its content key
    ///
    /// The website named by `page.hostname` must already exist.
    fn record_page(&mut self, page: &PageRecord) -> StorageResult<bool>;

    fn get_page(&self, content_key: &str) -> StorageResult<Option<PageRecord>>;

    // ===== Images and buttons =====

    fn image_verdict(&self, url: &str) -> StorageResult<Option<ImageVerdict>>;

    fn record_image_verdict(&mut self, url: &str, verdict: &ImageVerdict) -> StorageResult<()>;

    fn has_button(&self, content_hash: &str) -> StorageResult<bool>;

    fn insert_button(&mut self, button: &NewButton) -> StorageResult<bool>;

    fn get_button(&self, content_hash: &str) -> StorageResult<Option<ButtonRecord>>;

    /// Links a stored button to a page it appeared on
    fn record_sighting(&mut self, sighting: &ButtonSighting) -> StorageResult<bool>;

    fn count_sightings(&self, content_hash: &str) -> StorageResult<u64>;

    // ===== Keywords and embeddings =====

    /// Adds keyword frequencies for a page; repeated words accumulate
    fn add_keywords(&mut self, page_url: &str, words: &HashMap<String, usize>)
        -> StorageResult<()>;

    fn keyword_frequency(&self, word: &str, page_url: &str) -> StorageResult<Option<u64>>;

    fn store_embedding(&mut self, page_url: &str, field: &str, vector: &[f32])
        -> StorageResult<()>;

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StorageCounts>;

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64>;
}
