//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::robots::RobotsState;
use crate::state::{ImageVerdict, PageState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    ButtonRecord, ButtonSighting, NewButton, PageRecord, StorageCounts, WebsiteRecord,
};
use crate::TrawlerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

const WEBSITE_COLUMNS: &str = "id, hostname, root_url, is_scraped, robots_fetched, robots_failed,
     robots_body, discovered_at, scraped_at";

const PAGE_COLUMNS: &str = "p.content_key, p.url, w.hostname, p.state, p.status_code, p.title,
     p.description, p.extracted_text, p.button_count";

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(TrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, TrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, TrawlerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn website_id(&self, hostname: &str) -> StorageResult<i64> {
        self.conn
            .query_row(
                "SELECT id FROM websites WHERE hostname = ?1",
                params![hostname],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::WebsiteNotFound(hostname.to_string()))
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn website_from_row(row: &Row<'_>) -> rusqlite::Result<WebsiteRecord> {
    Ok(WebsiteRecord {
        id: row.get(0)?,
        hostname: row.get(1)?,
        root_url: row.get(2)?,
        is_scraped: row.get(3)?,
        robots: RobotsState::from_columns(row.get(4)?, row.get(5)?, row.get(6)?),
        discovered_at: row.get(7)?,
        scraped_at: row.get(8)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        content_key: row.get(0)?,
        url: row.get(1)?,
        hostname: row.get(2)?,
        state: PageState::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(PageState::Processed),
        status_code: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        extracted_text: row.get(7)?,
        button_count: row.get(8)?,
    })
}

fn split_tags(tags: String) -> Vec<String> {
    tags.split(',')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

impl Storage for SqliteStorage {
    // ===== Websites =====

    fn ensure_website(&mut self, hostname: &str, root_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO websites (hostname, root_url, discovered_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(hostname) DO NOTHING",
            params![hostname, root_url, now],
        )?;
        self.website_id(hostname)
    }

    fn get_website(&self, hostname: &str) -> StorageResult<Option<WebsiteRecord>> {
        let sql = format!("SELECT {} FROM websites WHERE hostname = ?1", WEBSITE_COLUMNS);
        let website = self
            .conn
            .query_row(&sql, params![hostname], website_from_row)
            .optional()?;
        Ok(website)
    }

    fn pending_websites(&self, limit: usize) -> StorageResult<Vec<WebsiteRecord>> {
        let sql = format!(
            "SELECT {} FROM websites WHERE is_scraped = 0 ORDER BY id LIMIT ?1",
            WEBSITE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let websites = stmt
            .query_map(params![limit as i64], website_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(websites)
    }

    fn mark_website_scraped(&mut self, hostname: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE websites SET is_scraped = 1, scraped_at = ?1 WHERE hostname = ?2",
            params![now, hostname],
        )?;
        Ok(())
    }

    fn reset_website(&mut self, hostname: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE websites SET is_scraped = 0, scraped_at = NULL WHERE hostname = ?1",
            params![hostname],
        )?;
        Ok(())
    }

    fn save_robots_state(&mut self, hostname: &str, state: &RobotsState) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE websites SET robots_fetched = ?1, robots_failed = ?2, robots_body = ?3
             WHERE hostname = ?4",
            params![state.is_known(), state.is_failed(), state.body(), hostname],
        )?;
        Ok(())
    }

    // ===== Pages =====

    fn is_page_recorded(&self, content_key: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM pages WHERE content_key = ?1",
                params![content_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn record_page(&mut self, page: &PageRecord) -> StorageResult<bool> {
        let website_id = self.website_id(&page.hostname)?;
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO pages (content_key, url, website_id, state, status_code, title,
                                description, extracted_text, button_count, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(content_key) DO NOTHING",
            params![
                page.content_key,
                page.url,
                website_id,
                page.state.to_db_string(),
                page.status_code,
                page.title,
                page.description,
                page.extracted_text,
                page.button_count,
                now,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_page(&self, content_key: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM pages p JOIN websites w ON w.id = p.website_id
             WHERE p.content_key = ?1",
            PAGE_COLUMNS
        );
        let page = self
            .conn
            .query_row(&sql, params![content_key], page_from_row)
            .optional()?;
        Ok(page)
    }

    // ===== Images and buttons =====

    fn image_verdict(&self, url: &str) -> StorageResult<Option<ImageVerdict>> {
        let hash: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT content_hash FROM image_urls WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        Ok(hash.map(|hash| match hash {
            Some(hash) => ImageVerdict::Button(hash),
            None => ImageVerdict::NotButton,
        }))
    }

    fn record_image_verdict(&mut self, url: &str, verdict: &ImageVerdict) -> StorageResult<()> {
        let hash = match verdict {
            ImageVerdict::Button(hash) => Some(hash.as_str()),
            ImageVerdict::NotButton => None,
        };
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO image_urls (url, content_hash, checked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO NOTHING",
            params![url, hash, now],
        )?;
        Ok(())
    }

    fn has_button(&self, content_hash: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM buttons WHERE content_hash = ?1",
                params![content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_button(&mut self, button: &NewButton) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT INTO buttons (content_hash, source_url, links_to, color_tags, average_color,
                                  alt_text, image, found_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(content_hash) DO NOTHING",
            params![
                button.content_hash,
                button.source_url,
                button.links_to,
                button.color_tags.join(","),
                button.average_color,
                button.alt_text,
                button.image,
                now,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_button(&self, content_hash: &str) -> StorageResult<Option<ButtonRecord>> {
        let button = self
            .conn
            .query_row(
                "SELECT id, content_hash, source_url, links_to, color_tags, average_color, alt_text
                 FROM buttons WHERE content_hash = ?1",
                params![content_hash],
                |row| {
                    Ok(ButtonRecord {
                        id: row.get(0)?,
                        content_hash: row.get(1)?,
                        source_url: row.get(2)?,
                        links_to: row.get(3)?,
                        color_tags: split_tags(row.get(4)?),
                        average_color: row.get(5)?,
                        alt_text: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(button)
    }

    fn record_sighting(&mut self, sighting: &ButtonSighting) -> StorageResult<bool> {
        let website_id = self.website_id(&sighting.hostname)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO button_sightings (button_id, website_id, page_url, links_to)
             SELECT id, ?2, ?3, ?4 FROM buttons WHERE content_hash = ?1",
            params![
                sighting.content_hash,
                website_id,
                sighting.page_url,
                sighting.links_to
            ],
        )?;
        Ok(inserted > 0)
    }

    fn count_sightings(&self, content_hash: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM button_sightings s JOIN buttons b ON b.id = s.button_id
             WHERE b.content_hash = ?1",
            params![content_hash],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Keywords and embeddings =====

    fn add_keywords(
        &mut self,
        page_url: &str,
        words: &HashMap<String, usize>,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut insert_word =
                tx.prepare("INSERT INTO keywords (word) VALUES (?1) ON CONFLICT(word) DO NOTHING")?;
            let mut insert_entry = tx.prepare(
                "INSERT INTO keyword_index (keyword_id, page_url, frequency)
                 SELECT id, ?2, ?3 FROM keywords WHERE word = ?1
                 ON CONFLICT(keyword_id, page_url)
                 DO UPDATE SET frequency = frequency + excluded.frequency",
            )?;

            for (word, frequency) in words {
                insert_word.execute(params![word])?;
                insert_entry.execute(params![word, page_url, *frequency as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn keyword_frequency(&self, word: &str, page_url: &str) -> StorageResult<Option<u64>> {
        let frequency: Option<i64> = self
            .conn
            .query_row(
                "SELECT i.frequency FROM keyword_index i JOIN keywords k ON k.id = i.keyword_id
                 WHERE k.word = ?1 AND i.page_url = ?2",
                params![word, page_url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(frequency.map(|f| f as u64))
    }

    fn store_embedding(
        &mut self,
        page_url: &str,
        field: &str,
        vector: &[f32],
    ) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(vector).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO page_embeddings (page_url, field, vector) VALUES (?1, ?2, ?3)
             ON CONFLICT(page_url, field) DO NOTHING",
            params![page_url, field, encoded],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StorageCounts> {
        Ok(StorageCounts {
            websites: self.count("SELECT COUNT(*) FROM websites")?,
            scraped_websites: self.count("SELECT COUNT(*) FROM websites WHERE is_scraped = 1")?,
            pending_websites: self.count("SELECT COUNT(*) FROM websites WHERE is_scraped = 0")?,
            pages: self.count("SELECT COUNT(*) FROM pages")?,
            buttons: self.count("SELECT COUNT(*) FROM buttons")?,
            sightings: self.count("SELECT COUNT(*) FROM button_sightings")?,
            keywords: self.count("SELECT COUNT(*) FROM keywords")?,
        })
    }

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
