//! Single-site crawl
//!
//! Drives one website from its root to completion: robots policy, frontier,
//! page loading, button classification, text indexing and discovery of other
//! websites. Every site crawl ends with the website marked scraped.

use crate::analysis::{embedding_text, keyword_frequencies};
use crate::config::Config;
use crate::crawler::classifier::{ButtonClassifier, ImageOutcome};
use crate::crawler::embeddings::{EmbeddingClient, EMBEDDED_FIELDS};
use crate::crawler::extract::{
    reconcile, FallbackSource, MarkupSource, PageExtraction, PageSource, RawPage, SourceError,
};
use crate::crawler::fetcher::{HttpTransport, Transport};
use crate::crawler::frontier::Frontier;
use crate::crawler::render_worker::RenderWorkerSource;
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::state::{CrawlCache, PageState};
use crate::storage::{with_storage, ButtonSighting, PageRecord, SharedStorage};
use crate::url::{
    canonicalize, content_key, extract_host, same_site, site_key, Blocklist, LinkVerdict,
};
use crate::{TrawlerError, UrlError};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Shared, read-only state for every site worker
pub struct CrawlContext {
    pub config: Arc<Config>,
    pub storage: SharedStorage,
    pub cache: Arc<CrawlCache>,
    pub transport: Arc<dyn Transport>,
    pub source: Arc<dyn PageSource>,
    pub classifier: ButtonClassifier,
    pub embeddings: Option<EmbeddingClient>,
    pub blocklist: Blocklist,
}

impl CrawlContext {
    /// Builds the context with the reqwest transport
    pub fn new(config: Config, storage: SharedStorage) -> Result<Self, TrawlerError> {
        let transport = HttpTransport::from_config(&config.user_agent)?;
        let client = transport.client().clone();
        Ok(Self::with_transport(config, storage, Arc::new(transport), client))
    }

    /// Builds the context around an existing transport
    ///
    /// `client` is used for the render worker and embedding service.
    pub fn with_transport(
        config: Config,
        storage: SharedStorage,
        transport: Arc<dyn Transport>,
        client: Client,
    ) -> Self {
        let markup = MarkupSource::new(transport.clone());
        let source: Arc<dyn PageSource> = match &config.services.render_worker {
            Some(base) => Arc::new(FallbackSource::new(
                Box::new(RenderWorkerSource::new(client.clone(), base.clone())),
                Box::new(markup),
            )),
            None => Arc::new(markup),
        };

        let embeddings = config
            .services
            .embedding
            .as_ref()
            .map(|endpoint| EmbeddingClient::new(client, endpoint.clone()));

        let cache = Arc::new(CrawlCache::new());
        let classifier = ButtonClassifier::new(transport.clone(), storage.clone(), cache.clone());
        let blocklist = Blocklist::new(&config.blocklist);

        Self {
            config: Arc::new(config),
            storage,
            cache,
            transport,
            source,
            classifier,
            embeddings,
            blocklist,
        }
    }
}

/// How a site crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcome {
    Crawled,
    /// The site is on the forbidden or ignored list
    Forbidden,
    /// robots.txt disallows the root and every alternate root
    RootDisallowed,
}

/// Summary of one site crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub hostname: String,
    pub outcome: SiteOutcome,
    pub pages_fetched: u32,
    pub pages_recorded: u32,
    pub pages_disallowed: u32,
    pub pages_failed: u32,
    pub buttons_found: u32,
    pub buttons_new: u32,
    pub websites_discovered: u32,
}

impl SiteReport {
    fn new(hostname: &str, outcome: SiteOutcome) -> Self {
        Self {
            hostname: hostname.to_string(),
            outcome,
            pages_fetched: 0,
            pages_recorded: 0,
            pages_disallowed: 0,
            pages_failed: 0,
            buttons_found: 0,
            buttons_new: 0,
            websites_discovered: 0,
        }
    }
}

/// Crawls the website rooted at `root` and marks it scraped
///
/// The website is marked scraped whatever happens, including errors.
pub async fn crawl_site(ctx: &CrawlContext, root: &Url) -> Result<SiteReport, TrawlerError> {
    let hostname = site_key(root).ok_or(UrlError::MissingHost)?;

    let result = SiteCrawler::new(ctx, root.clone(), hostname.clone())
        .run()
        .await;

    with_storage(&ctx.storage, |s| s.mark_website_scraped(&hostname))?;

    if let Ok(report) = &result {
        tracing::info!(
            "Finished {} ({:?}): {} fetched, {} recorded, {} disallowed, {} buttons ({} new), {} sites discovered",
            report.hostname,
            report.outcome,
            report.pages_fetched,
            report.pages_recorded,
            report.pages_disallowed,
            report.buttons_found,
            report.buttons_new,
            report.websites_discovered
        );
    }

    result
}

struct SiteCrawler<'a> {
    ctx: &'a CrawlContext,
    root: Url,
    hostname: String,
    report: SiteReport,
}

impl<'a> SiteCrawler<'a> {
    fn new(ctx: &'a CrawlContext, root: Url, hostname: String) -> Self {
        let report = SiteReport::new(&hostname, SiteOutcome::Crawled);
        Self {
            ctx,
            root,
            hostname,
            report,
        }
    }

    async fn run(mut self) -> Result<SiteReport, TrawlerError> {
        with_storage(&self.ctx.storage, |s| {
            s.ensure_website(&self.hostname, self.root.as_str())
        })?;

        if self.ctx.blocklist.classify(&self.root) == LinkVerdict::Blocked {
            tracing::info!("Skipping forbidden site {}", self.hostname);
            self.report.outcome = SiteOutcome::Forbidden;
            return Ok(self.report);
        }

        let policy = self.load_policy().await?;

        let Some(start) = self.start_url(&policy) else {
            tracing::info!("robots.txt disallows the root of {}", self.hostname);
            self.report.outcome = SiteOutcome::RootDisallowed;
            return Ok(self.report);
        };

        let mut frontier =
            Frontier::from_config(start, &self.ctx.config.crawler, policy.crawl_delay());

        while let Some(url) = frontier.next_url() {
            if let Err(e) = self.visit(&mut frontier, &policy, &url).await {
                tracing::warn!("Failed to process {}: {}", url, e);
                self.report.pages_failed += 1;
            }
        }

        Ok(self.report)
    }

    /// Handles one URL popped from the frontier
    ///
    /// Errors are confined to this page; the caller moves on to the next URL.
    async fn visit(
        &mut self,
        frontier: &mut Frontier,
        policy: &RobotsPolicy,
        url: &Url,
    ) -> Result<(), TrawlerError> {
        let key = content_key(url);
        if with_storage(&self.ctx.storage, |s| s.is_page_recorded(&key))? {
            tracing::trace!("Already recorded: {}", url);
            return Ok(());
        }

        if !policy.is_allowed(url) {
            tracing::debug!("Disallowed by robots.txt: {}", url);
            self.record_sentinel(&key, url, PageState::Disallowed)?;
            self.report.pages_disallowed += 1;
            return Ok(());
        }

        frontier.wait_turn().await;
        frontier.record_fetch();
        self.report.pages_fetched += 1;

        match self.ctx.source.load(url).await {
            Ok(raw) => {
                let links = self.process_page(&key, url, raw).await?;
                frontier.enqueue_discovered(&links, |candidate| {
                    with_storage(&self.ctx.storage, |s| s.is_page_recorded(candidate))
                        .unwrap_or(false)
                });
            }
            Err(SourceError::Forbidden) => {
                self.record_sentinel(&key, url, PageState::Forbidden)?;
            }
            Err(SourceError::Absent) => {
                self.record_sentinel(&key, url, PageState::DeadLink)?;
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", url, e);
                self.report.pages_failed += 1;
            }
        }

        Ok(())
    }

    /// Loads the robots policy, fetching robots.txt only when its state is unknown
    async fn load_policy(&self) -> Result<RobotsPolicy, TrawlerError> {
        let stored = with_storage(&self.ctx.storage, |s| s.get_website(&self.hostname))?
            .map(|website| website.robots)
            .filter(|robots| robots.is_known());

        let state = match stored {
            Some(state) => state,
            None => {
                let state = fetch_robots(
                    self.ctx.transport.as_ref(),
                    &self.root,
                    self.ctx.config.crawler.max_robots_size,
                )
                .await;
                with_storage(&self.ctx.storage, |s| {
                    s.save_robots_state(&self.hostname, &state)
                })?;
                state
            }
        };

        Ok(state.policy(&self.root, &self.ctx.config.user_agent.robots_agent()))
    }

    /// The root, or the first allowed alternate root
    fn start_url(&self, policy: &RobotsPolicy) -> Option<Url> {
        if policy.is_allowed(&self.root) {
            return Some(self.root.clone());
        }

        self.ctx
            .config
            .crawler
            .alternate_roots
            .iter()
            .filter_map(|path| canonicalize(&self.root, path))
            .filter(|url| same_site(url, &self.root))
            .find(|url| policy.is_allowed(url))
    }

    fn record_sentinel(
        &mut self,
        key: &str,
        url: &Url,
        state: PageState,
    ) -> Result<(), TrawlerError> {
        let page = PageRecord::sentinel(key, url.as_str(), &self.hostname, state);
        if with_storage(&self.ctx.storage, |s| s.record_page(&page))? {
            self.report.pages_recorded += 1;
        }
        Ok(())
    }

    /// Indexes a loaded page and returns its same-site links
    async fn process_page(
        &mut self,
        key: &str,
        url: &Url,
        raw: RawPage,
    ) -> Result<Vec<Url>, TrawlerError> {
        let base = if same_site(&raw.final_url, url) {
            raw.final_url.clone()
        } else {
            url.clone()
        };
        let extraction = reconcile(&base, &raw, &self.ctx.blocklist);

        let button_count = self.collect_buttons(url, &extraction).await?;
        self.index_text(url, &extraction)?;

        let page = PageRecord {
            content_key: key.to_string(),
            url: url.to_string(),
            hostname: self.hostname.clone(),
            state: PageState::Processed,
            status_code: Some(raw.status_code),
            title: extraction.title.clone(),
            description: extraction.description.clone(),
            extracted_text: Some(extraction.text.clone()),
            button_count,
        };
        if with_storage(&self.ctx.storage, |s| s.record_page(&page))? {
            self.report.pages_recorded += 1;
        }

        self.embed_page(url, &extraction).await?;
        self.discover_websites(&extraction)?;

        Ok(extraction.same_host_links)
    }

    async fn collect_buttons(
        &mut self,
        url: &Url,
        extraction: &PageExtraction,
    ) -> Result<u32, TrawlerError> {
        let mut count = 0;

        for candidate in &extraction.images {
            let outcome = self.ctx.classifier.classify(candidate).await?;
            let ImageOutcome::Button {
                content_hash,
                is_new,
            } = outcome
            else {
                continue;
            };

            let sighting = ButtonSighting {
                content_hash,
                hostname: self.hostname.clone(),
                page_url: url.to_string(),
                links_to: candidate.links_to.as_ref().map(|u| u.to_string()),
            };
            with_storage(&self.ctx.storage, |s| s.record_sighting(&sighting))?;

            count += 1;
            self.report.buttons_found += 1;
            if is_new {
                self.report.buttons_new += 1;
            }
        }

        Ok(count)
    }

    fn index_text(&self, url: &Url, extraction: &PageExtraction) -> Result<(), TrawlerError> {
        let mut text = extraction.text.clone();
        for extra in [&extraction.title, &extraction.description].into_iter().flatten() {
            text.push(' ');
            text.push_str(extra);
        }

        let frequencies = keyword_frequencies(&text);
        if frequencies.is_empty() {
            return Ok(());
        }
        with_storage(&self.ctx.storage, |s| s.add_keywords(url.as_str(), &frequencies))
    }

    /// Embeds body, title and description; service failures only log
    async fn embed_page(
        &self,
        url: &Url,
        extraction: &PageExtraction,
    ) -> Result<(), TrawlerError> {
        let Some(client) = &self.ctx.embeddings else {
            return Ok(());
        };

        let limit = self.ctx.config.crawler.embedding_text_limit;
        let body = embedding_text(&extraction.text, limit);
        let values = [
            Some(body),
            extraction.title.clone(),
            extraction.description.clone(),
        ];

        for (field, value) in EMBEDDED_FIELDS.iter().zip(values) {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };

            match client.embed(&value).await {
                Ok(vector) => with_storage(&self.ctx.storage, |s| {
                    s.store_embedding(url.as_str(), field, &vector)
                })?,
                Err(e) => tracing::warn!("Embedding {} of {} failed: {}", field, url, e),
            }
        }

        Ok(())
    }

    /// Queues every newly referenced website
    fn discover_websites(&mut self, extraction: &PageExtraction) -> Result<(), TrawlerError> {
        for root in &extraction.external_sites {
            let Some(hostname) = site_key(root) else {
                continue;
            };
            let host = extract_host(root).unwrap_or_default();
            if self.ctx.blocklist.is_forbidden_site(&host) {
                continue;
            }

            let is_new = with_storage(&self.ctx.storage, |s| {
                let known = s.get_website(&hostname)?.is_some();
                if !known {
                    s.ensure_website(&hostname, root.as_str())?;
                }
                Ok(!known)
            })?;
            if is_new {
                tracing::debug!("Discovered website {}", hostname);
                self.report.websites_discovered += 1;
            }
        }
        Ok(())
    }
}
