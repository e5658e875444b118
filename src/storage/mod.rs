//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - Websites and their robots.txt state
//! - Recorded pages, buttons and button sightings
//! - Keyword index and page embeddings

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::robots::RobotsState;
use crate::state::PageState;
use crate::TrawlerError;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage shared by all site workers
///
/// Locks are taken for a single call and never held across an `.await`.
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Opens (or creates) the database and wraps it for sharing
pub fn open_shared_storage(path: &Path) -> Result<SharedStorage, TrawlerError> {
    Ok(share(SqliteStorage::new(path)?))
}

pub fn share<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Runs `f` with the storage lock held
pub fn with_storage<T>(
    storage: &SharedStorage,
    f: impl FnOnce(&mut (dyn Storage + Send)) -> StorageResult<T>,
) -> Result<T, TrawlerError> {
    let mut guard = storage.lock().map_err(|_| TrawlerError::LockPoisoned)?;
    Ok(f(&mut *guard)?)
}

/// A website known to the crawler
#[derive(Debug, Clone)]
pub struct WebsiteRecord {
    pub id: i64,
    /// `host[:port]`
    pub hostname: String,
    pub root_url: String,
    pub is_scraped: bool,
    pub robots: RobotsState,
    pub discovered_at: String,
    pub scraped_at: Option<String>,
}

/// A fetched or ruled-out page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub content_key: String,
    pub url: String,
    /// Website the page belongs to
    pub hostname: String,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub extracted_text: Option<String>,
    pub button_count: u32,
}

impl PageRecord {
    /// A sentinel record for a page that was not (or could not be) processed
    pub fn sentinel(content_key: &str, url: &str, hostname: &str, state: PageState) -> Self {
        Self {
            content_key: content_key.to_string(),
            url: url.to_string(),
            hostname: hostname.to_string(),
            state,
            status_code: state.sentinel_status(),
            title: None,
            description: None,
            extracted_text: None,
            button_count: 0,
        }
    }
}

/// A button seen for the first time, with its image bytes
#[derive(Debug, Clone)]
pub struct NewButton {
    pub content_hash: String,
    pub source_url: String,
    pub links_to: Option<String>,
    pub color_tags: Vec<String>,
    pub average_color: String,
    pub alt_text: Option<String>,
    pub image: Vec<u8>,
}

/// A stored button, without its image bytes
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonRecord {
    pub id: i64,
    pub content_hash: String,
    pub source_url: String,
    pub links_to: Option<String>,
    pub color_tags: Vec<String>,
    pub average_color: String,
    pub alt_text: Option<String>,
}

/// One appearance of a button on a page
#[derive(Debug, Clone)]
pub struct ButtonSighting {
    pub content_hash: String,
    pub hostname: String,
    pub page_url: String,
    pub links_to: Option<String>,
}

/// Row counts used by the `stats` command and sweep logging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageCounts {
    pub websites: u64,
    pub scraped_websites: u64,
    pub pending_websites: u64,
    pub pages: u64,
    pub buttons: u64,
    pub sightings: u64,
    pub keywords: u64,
}
