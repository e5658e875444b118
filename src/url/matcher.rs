use crate::config::BlocklistConfig;
use crate::url::domain::extract_host;
use url::Url;

/// Checks if a host matches a wildcard pattern
///
/// `"example.com"` only matches itself; `"*.example.com"` matches the bare
/// domain and any subdomain of it.
///
/// # Examples
///
/// ```
/// use button_trawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "blog.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Outcome of checking a URL against the blocklist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkVerdict {
    /// Nothing objects to the URL
    Allow,
    /// Asset or CDN URL: not a page or button, though its host may still be a website
    Asset,
    /// Third-party platform or forbidden site: dropped entirely
    Blocked,
}

/// Host and path rules applied to every discovered link and image
#[derive(Debug, Clone)]
pub struct Blocklist {
    ignored_prefixes: Vec<String>,
    ignored_hosts: Vec<String>,
    forbidden_sites: Vec<String>,
}

impl Blocklist {
    pub fn new(config: &BlocklistConfig) -> Self {
        Self {
            ignored_prefixes: config
                .ignored_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            ignored_hosts: config.ignored_hosts.iter().map(|h| h.to_lowercase()).collect(),
            forbidden_sites: config
                .forbidden_sites
                .iter()
                .map(|h| h.to_lowercase())
                .collect(),
        }
    }

    /// Classifies a canonical URL
    ///
    /// Host rules win over asset rules, so a CDN subdomain of a blocked
    /// platform is still `Blocked`.
    pub fn classify(&self, url: &Url) -> LinkVerdict {
        let Some(host) = extract_host(url) else {
            return LinkVerdict::Blocked;
        };

        if self.is_ignored_host(&host) || self.is_forbidden_site(&host) {
            return LinkVerdict::Blocked;
        }

        if self.is_asset(&host, url.path()) {
            return LinkVerdict::Asset;
        }

        LinkVerdict::Allow
    }

    /// True for hosts that must never be crawled as websites
    pub fn is_forbidden_site(&self, host: &str) -> bool {
        self.forbidden_sites
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    fn is_ignored_host(&self, host: &str) -> bool {
        self.ignored_hosts
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    /// Prefixes starting with `/` apply to the path, the rest to the host
    fn is_asset(&self, host: &str, path: &str) -> bool {
        let path = path.to_lowercase();
        self.ignored_prefixes.iter().any(|prefix| {
            if prefix.starts_with('/') {
                path == *prefix || path.contains(&format!("{}/", prefix))
            } else {
                host.starts_with(prefix.as_str())
            }
        })
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new(&BlocklistConfig::default())
    }
}
