//! URL handling module
//!
//! This module provides URL canonicalization, the page content key, website
//! keys, wildcard host matching and the link blocklist.

mod canonical;
mod domain;
mod matcher;

use sha2::{Digest, Sha256};
use url::Url;

// Re-export main functions
pub use canonical::{canonicalize, parse_root};
pub use domain::{extract_host, same_site, site_key};
pub use matcher::{matches_wildcard, Blocklist, LinkVerdict};

/// Computes the content key under which a page is recorded
///
/// The key is the hex SHA-256 of `host[:port] + path`, followed by
/// `"?" + query` when a query is present. Scheme and fragment do not
/// contribute, so `http` and `https` copies of a page share one key.
///
/// # Examples
///
/// ```
/// use button_trawler::url::content_key;
/// use url::Url;
///
/// let a = content_key(&Url::parse("https://site.example/links").unwrap());
/// let b = content_key(&Url::parse("http://site.example/links").unwrap());
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn content_key(url: &Url) -> String {
    let mut material = site_key(url).unwrap_or_default();
    material.push_str(url.path());
    if let Some(query) = url.query() {
        material.push('?');
        material.push_str(query);
    }

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}
