use serde::Deserialize;

/// Main configuration structure for the trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub blocklist: BlocklistConfig,
    /// Websites (hostnames or root URLs) inserted as pending before a sweep
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched from one site per run
    #[serde(rename = "max-pages-per-site", default = "default_max_pages")]
    pub max_pages_per_site: u32,

    /// Minimum time between two fetches on the same site (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Number of sites crawled concurrently
    #[serde(rename = "concurrent-sites", default = "default_concurrent_sites")]
    pub concurrent_sites: u32,

    /// Pending websites pulled from storage per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Safety cap on sites processed in one sweep
    #[serde(rename = "max-sites-per-sweep", default = "default_max_sites")]
    pub max_sites_per_sweep: u32,

    /// Pause between sweeps that found nothing to do (milliseconds)
    #[serde(rename = "idle-interval", default = "default_idle_interval")]
    pub idle_interval: u64,

    /// robots.txt bodies larger than this are ignored (bytes)
    #[serde(rename = "max-robots-size", default = "default_max_robots_size")]
    pub max_robots_size: usize,

    /// Characters of page text sent to the embedding service
    #[serde(rename = "embedding-text-limit", default = "default_embedding_limit")]
    pub embedding_text_limit: usize,

    /// Path fragments that move a link to the front of the queue
    #[serde(rename = "priority-keywords", default = "default_priority_keywords")]
    pub priority_keywords: Vec<String>,

    /// Paths tried when robots.txt disallows the root
    #[serde(rename = "alternate-roots", default = "default_alternate_roots")]
    pub alternate_roots: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages_per_site: default_max_pages(),
            request_delay: default_request_delay(),
            concurrent_sites: default_concurrent_sites(),
            batch_size: default_batch_size(),
            max_sites_per_sweep: default_max_sites(),
            idle_interval: default_idle_interval(),
            max_robots_size: default_max_robots_size(),
            embedding_text_limit: default_embedding_limit(),
            priority_keywords: default_priority_keywords(),
            alternate_roots: default_alternate_roots(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the agent matched in robots.txt groups
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }

    /// The agent token looked up in robots.txt groups
    pub fn robots_agent(&self) -> String {
        self.crawler_name.to_lowercase()
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// External services used while crawling
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfig {
    /// Render worker base; the encoded target URL is appended to it
    #[serde(rename = "render-worker")]
    pub render_worker: Option<String>,

    /// Embedding endpoint receiving `{"text": ...}`
    pub embedding: Option<String>,

    #[serde(rename = "require-render-worker", default)]
    pub require_render_worker: bool,

    #[serde(rename = "require-embedding", default)]
    pub require_embedding: bool,
}

/// Hosts and paths that are never fetched
#[derive(Debug, Clone, Deserialize)]
pub struct BlocklistConfig {
    /// Host prefixes and path fragments of asset/CDN URLs
    #[serde(rename = "ignored-prefixes", default = "default_ignored_prefixes")]
    pub ignored_prefixes: Vec<String>,

    /// Third-party hosts whose links and images are dropped
    #[serde(rename = "ignored-hosts", default = "default_ignored_hosts")]
    pub ignored_hosts: Vec<String>,

    /// Large platforms that are never crawled as websites
    #[serde(rename = "forbidden-sites", default = "default_forbidden_sites")]
    pub forbidden_sites: Vec<String>,
}

impl Default for BlocklistConfig {
    fn default() -> Self {
        Self {
            ignored_prefixes: default_ignored_prefixes(),
            ignored_hosts: default_ignored_hosts(),
            forbidden_sites: default_forbidden_sites(),
        }
    }
}

fn default_max_pages() -> u32 {
    75
}

fn default_request_delay() -> u64 {
    1000
}

fn default_concurrent_sites() -> u32 {
    10
}

fn default_batch_size() -> u32 {
    50
}

fn default_max_sites() -> u32 {
    10_000
}

fn default_idle_interval() -> u64 {
    60_000
}

fn default_max_robots_size() -> usize {
    5000
}

fn default_embedding_limit() -> usize {
    2000
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_priority_keywords() -> Vec<String> {
    strings(&["/buttons", "/links", "/outbound", "/sitemap", "/about"])
}

fn default_alternate_roots() -> Vec<String> {
    strings(&["/index.html"])
}

fn default_ignored_prefixes() -> Vec<String> {
    strings(&["cdn.", "dash.", "static.", "assets.", "images.", "/cdn-cgi"])
}

fn default_ignored_hosts() -> Vec<String> {
    strings(&[
        "example.com",
        "test.com",
        "*.google.com",
        "bsky.app",
        "youtu.be",
        "*.youtube.com",
        "soundcloud.com",
        "bandlab.com",
        "*.linkedin.com",
        "imgur.com",
        "i.imgur.com",
    ])
}

fn default_forbidden_sites() -> Vec<String> {
    strings(&[
        "*.google.com",
        "raw.githubusercontent.com",
        "catbox.moe",
        "*.facebook.com",
        "github.com",
        "x.com",
        "*.instagram.com",
        "twitter.com",
        "*.tiktok.com",
        "*.reddit.com",
        "*.tumblr.com",
        "*.pinterest.com",
        "*.flickr.com",
        "*.youtube.com",
        "vimeo.com",
        "dailymotion.com",
        "liveleak.com",
        "newgrounds.com",
        "deviantart.com",
        "artstation.com",
        "ze.wtf",
    ])
}
