//! Database schema definitions
//!
//! All tables are created with `IF NOT EXISTS`, so bootstrapping an existing
//! database is a no-op.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per website (host[:port]) ever referenced
CREATE TABLE IF NOT EXISTS websites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL UNIQUE,
    root_url TEXT NOT NULL,
    is_scraped INTEGER NOT NULL DEFAULT 0,
    robots_fetched INTEGER NOT NULL DEFAULT 0,
    robots_failed INTEGER NOT NULL DEFAULT 0,
    robots_body TEXT,
    discovered_at TEXT NOT NULL,
    scraped_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_websites_pending ON websites(is_scraped);

-- Pages that have been fetched or ruled out, keyed by content key
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_key TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    website_id INTEGER NOT NULL REFERENCES websites(id),
    state TEXT NOT NULL,
    status_code INTEGER,
    title TEXT,
    description TEXT,
    extracted_text TEXT,
    button_count INTEGER NOT NULL DEFAULT 0,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_website ON pages(website_id);
CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);

-- Unique button images, keyed by content hash
CREATE TABLE IF NOT EXISTS buttons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_hash TEXT NOT NULL UNIQUE,
    source_url TEXT NOT NULL,
    links_to TEXT,
    color_tags TEXT NOT NULL,
    average_color TEXT NOT NULL,
    alt_text TEXT,
    image BLOB NOT NULL,
    found_at TEXT NOT NULL
);

-- Every page a button was seen on
CREATE TABLE IF NOT EXISTS button_sightings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    button_id INTEGER NOT NULL REFERENCES buttons(id),
    website_id INTEGER NOT NULL REFERENCES websites(id),
    page_url TEXT NOT NULL,
    links_to TEXT,
    UNIQUE(button_id, page_url)
);

CREATE INDEX IF NOT EXISTS idx_sightings_website ON button_sightings(website_id);

-- Verdict per image URL; a NULL hash means "not a button"
CREATE TABLE IF NOT EXISTS image_urls (
    url TEXT PRIMARY KEY,
    content_hash TEXT,
    checked_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS keyword_index (
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    page_url TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    PRIMARY KEY (keyword_id, page_url)
);

CREATE TABLE IF NOT EXISTS page_embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_url TEXT NOT NULL,
    field TEXT NOT NULL,
    vector TEXT NOT NULL,
    UNIQUE(page_url, field)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
