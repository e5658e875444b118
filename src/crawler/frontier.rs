//! Crawl frontier for a single site
//!
//! This module handles:
//! - The breadth-first queue of same-site URLs
//! - Visited/queued deduplication by content key
//! - The per-run page cap
//! - Moving keyword links (`/buttons`, `/links`, ...) ahead of the rest
//! - The politeness delay between successive fetches

use crate::config::CrawlerConfig;
use crate::url::{content_key, same_site};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Breadth-first queue for one site crawl
#[derive(Debug)]
pub struct Frontier {
    root: Url,
    queue: VecDeque<Url>,
    /// Content keys currently in `queue`
    queued: HashSet<String>,
    /// Content keys already handed out by `next_url`
    visited: HashSet<String>,
    fetched: u32,
    max_pages: u32,
    priority_keywords: Vec<String>,
    delay: Duration,
    last_fetch: Option<Instant>,
}

impl Frontier {
    /// Creates a frontier seeded with `root`
    ///
    /// # Arguments
    ///
    /// * `root` - Canonical root URL; only links on its site are accepted
    /// * `max_pages` - Number of recorded fetches after which the run stops
    /// * `priority_keywords` - Path fragments that jump the queue
    /// * `delay` - Minimum time between two fetches
    pub fn new(
        root: Url,
        max_pages: u32,
        priority_keywords: Vec<String>,
        delay: Duration,
    ) -> Self {
        let mut frontier = Self {
            root: root.clone(),
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            fetched: 0,
            max_pages,
            priority_keywords: priority_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            delay,
            last_fetch: None,
        };
        frontier.queued.insert(content_key(&root));
        frontier.queue.push_back(root);
        frontier
    }

    /// Creates a frontier from the crawler settings and the site's crawl delay
    pub fn from_config(
        root: Url,
        config: &CrawlerConfig,
        crawl_delay: Option<Duration>,
    ) -> Self {
        Self::new(
            root,
            config.max_pages_per_site,
            config.priority_keywords.clone(),
            effective_delay(config, crawl_delay),
        )
    }

    fn is_priority(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        self.priority_keywords
            .iter()
            .any(|keyword| path.contains(keyword.as_str()))
    }

    /// Queues newly discovered links
    ///
    /// Links on other sites, links already visited or queued, and links for
    /// which `already_scraped` returns true (given the content key) are
    /// dropped. The rest are appended with keyword links first, each group
    /// keeping discovery order.
    ///
    /// # Returns
    ///
    /// The number of links queued
    pub fn enqueue_discovered<F>(&mut self, links: &[Url], mut already_scraped: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut priority = Vec::new();
        let mut other = Vec::new();

        for link in links {
            if !same_site(link, &self.root) {
                continue;
            }

            let key = content_key(link);
            if self.visited.contains(&key) || self.queued.contains(&key) {
                continue;
            }
            if already_scraped(&key) {
                continue;
            }

            self.queued.insert(key);
            if self.is_priority(link) {
                priority.push(link.clone());
            } else {
                other.push(link.clone());
            }
        }

        let added = priority.len() + other.len();
        self.queue.extend(priority);
        self.queue.extend(other);
        added
    }

    /// Next URL to process, or `None` once the queue is empty or the page
    /// cap has been reached
    pub fn next_url(&mut self) -> Option<Url> {
        if self.cap_reached() {
            return None;
        }

        let url = self.queue.pop_front()?;
        let key = content_key(&url);
        self.queued.remove(&key);
        self.visited.insert(key);
        Some(url)
    }

    /// Counts a page that went to the network
    pub fn record_fetch(&mut self) {
        self.fetched += 1;
    }

    pub fn fetched(&self) -> u32 {
        self.fetched
    }

    pub fn cap_reached(&self) -> bool {
        self.fetched >= self.max_pages
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleeps until the politeness delay since the previous fetch has passed
    pub async fn wait_turn(&mut self) {
        if let Some(last) = self.last_fetch {
            let ready_at = last + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last_fetch = Some(Instant::now());
    }
}

/// Calculates the effective delay for a site
///
/// This takes the maximum of:
/// - The configured request delay
/// - The robots.txt crawl delay (if specified)
pub fn effective_delay(config: &CrawlerConfig, crawl_delay: Option<Duration>) -> Duration {
    let config_delay = Duration::from_millis(config.request_delay);
    std::cmp::max(config_delay, crawl_delay.unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://site.example{}", path)).unwrap()
    }

    fn create_test_frontier(max_pages: u32) -> Frontier {
        Frontier::new(
            url("/"),
            max_pages,
            vec!["/buttons".to_string(), "/links".to_string()],
            Duration::ZERO,
        )
    }

    #[test]
    fn test_root_is_first() {
        let mut frontier = create_test_frontier(10);
        assert_eq!(frontier.next_url(), Some(url("/")));
        assert_eq!(frontier.next_url(), None);
    }

    #[test]
    fn test_priority_links_first() {
        let mut frontier = create_test_frontier(10);
        frontier.next_url();

        let added = frontier.enqueue_discovered(
            &[url("/b"), url("/a/buttons"), url("/c"), url("/LINKS")],
            |_| false,
        );
        assert_eq!(added, 4);

        let order: Vec<_> = std::iter::from_fn(|| frontier.next_url()).collect();
        assert_eq!(
            order,
            vec![url("/a/buttons"), url("/LINKS"), url("/b"), url("/c")]
        );
    }

    #[test]
    fn test_dedup_and_filtering() {
        let mut frontier = create_test_frontier(10);
        frontier.next_url();

        let links = [
            url("/"),
            url("/a"),
            url("/a"),
            Url::parse("http://site.example/a").unwrap(),
            Url::parse("https://other.example/a").unwrap(),
            url("/done"),
        ];
        let done = content_key(&url("/done"));
        let added = frontier.enqueue_discovered(&links, |key| key == done);

        assert_eq!(added, 1);
        assert_eq!(frontier.queue_len(), 1);
        assert_eq!(frontier.next_url(), Some(url("/a")));
        assert_eq!(frontier.enqueue_discovered(&[url("/a")], |_| false), 0);
    }

    #[test]
    fn test_cap_on_strongly_connected_graph() {
        // Every page links to every other page
        let pages: Vec<Url> = (0..20).map(|i| url(&format!("/p{}", i))).collect();
        let mut graph: HashMap<Url, Vec<Url>> = HashMap::new();
        graph.insert(url("/"), pages.clone());
        for page in &pages {
            let mut links = pages.clone();
            links.push(url("/"));
            graph.insert(page.clone(), links);
        }

        for (cap, expected) in [(5u32, 5usize), (50, 21)] {
            let mut frontier = create_test_frontier(cap);
            let mut visited = Vec::new();
            while let Some(next) = frontier.next_url() {
                frontier.record_fetch();
                frontier.enqueue_discovered(&graph[&next], |_| false);
                visited.push(next);
            }
            assert_eq!(visited.len(), expected);
            assert!(frontier.fetched() as usize == expected);
        }
    }

    #[test]
    fn test_effective_delay() {
        let config = CrawlerConfig {
            request_delay: 1000,
            ..CrawlerConfig::default()
        };
        assert_eq!(effective_delay(&config, None), Duration::from_secs(1));
        assert_eq!(
            effective_delay(&config, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(
            effective_delay(&config, Some(Duration::from_millis(200))),
            Duration::from_secs(1)
        );

        let frontier = Frontier::from_config(url("/"), &config, Some(Duration::from_secs(3)));
        assert_eq!(frontier.delay(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_wait_turn_enforces_delay() {
        let mut frontier = Frontier::new(url("/"), 10, vec![], Duration::from_millis(150));

        let start = Instant::now();
        frontier.wait_turn().await;
        assert!(start.elapsed() < Duration::from_millis(150));

        frontier.wait_turn().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
