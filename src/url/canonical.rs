use crate::{UrlError, UrlResult};
use url::Url;

/// Reference prefixes that never point at a fetchable document
const REJECTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "data:", "blob:", "tel:"];

/// Tracking query parameters removed during canonicalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Resolves a raw reference found on a page into a canonical absolute URL
///
/// # Canonicalization Steps
///
/// 1. Trim whitespace; reject empty and fragment-only references
/// 2. Reject `javascript:`, `mailto:`, `data:`, `blob:` and `tel:` references
/// 3. Resolve against `base` (scheme-relative `//host/x` inherits the base scheme)
/// 4. Reject anything that is not http(s) or has no host
/// 5. Collapse empty path segments, strip a non-root trailing slash
/// 6. Drop the fragment and tracking query parameters
///
/// Hosts come out lower-cased because the URL parser already folds them.
/// Applying the function to its own output returns the same URL.
///
/// # Examples
///
/// ```
/// use button_trawler::url::canonicalize;
/// use url::Url;
///
/// let base = Url::parse("https://Site.Example/blog/").unwrap();
/// let url = canonicalize(&base, "../links/?utm_source=ring#top").unwrap();
/// assert_eq!(url.as_str(), "https://site.example/links");
/// assert!(canonicalize(&base, "mailto:me@site.example").is_none());
/// ```
pub fn canonicalize(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let lowered = raw.to_ascii_lowercase();
    if REJECTED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let url = base.join(raw).ok()?;
    finish(url).ok()
}

/// Parses a website root given either as a bare hostname or as a URL
///
/// Bare hostnames, with or without a port, are assumed to be served over
/// https. A colon not followed by a port number marks a scheme, so
/// `mailto:` or `javascript:` inputs are rejected.
pub fn parse_root(input: &str) -> UrlResult<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Parse("empty root".to_string()));
    }

    let url = if input.contains("://") {
        Url::parse(input).map_err(|e| UrlError::Parse(e.to_string()))?
    } else if has_scheme_prefix(input) {
        return Err(UrlError::InvalidScheme(input.to_string()));
    } else {
        Url::parse(&format!("https://{}", input)).map_err(|e| UrlError::Parse(e.to_string()))?
    };

    finish(url)
}

/// True for `scheme:rest`, false for `host:port[/path]` and bracketed IPv6
fn has_scheme_prefix(input: &str) -> bool {
    if input.starts_with('[') {
        return false;
    }
    let Some((_, rest)) = input.split_once(':') else {
        return false;
    };
    let port = rest.split(['/', '?', '#']).next().unwrap_or_default();
    port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit())
}

fn finish(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);
    strip_tracking_params(&mut url);

    Ok(url)
}

/// Collapses repeated slashes and removes a trailing slash (except for root)
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

fn strip_tracking_params(url: &mut Url) {
    let Some(query) = url.query() else {
        return;
    };

    if query.is_empty() {
        url.set_query(None);
        return;
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let kept: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| !is_tracking_param(k)).collect();

    // Leave the original encoding alone unless something was removed
    if kept.len() == pairs.len() {
        return;
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
