//! Crawler coordinator - sweep orchestration
//!
//! This module fans site crawls out over a bounded worker pool:
//! - Ensuring the configured seed hosts exist as websites
//! - Pulling batches of pending websites from storage
//! - Running each batch with at most `concurrent-sites` workers
//! - Repeating sweeps forever in the default mode

use crate::config::Config;
use crate::crawler::site::{crawl_site, CrawlContext, SiteReport};
use crate::storage::{open_shared_storage, with_storage, SharedStorage, WebsiteRecord};
use crate::url::{parse_root, site_key};
use crate::{TrawlerError, UrlError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Totals for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sites_attempted: u32,
    pub sites_failed: u32,
    pub pages_fetched: u64,
    pub buttons_new: u64,
    /// The per-sweep site cap stopped the sweep
    pub capped: bool,
}

impl SweepReport {
    fn add_site(&mut self, report: &SiteReport) {
        self.pages_fetched += u64::from(report.pages_fetched);
        self.buttons_new += u64::from(report.buttons_new);
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a coordinator backed by the configured database
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Storage opened and HTTP client built
    /// * `Err(TrawlerError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self, TrawlerError> {
        let storage = open_shared_storage(Path::new(&config.output.database_path))?;
        Ok(Self::with_context(CrawlContext::new(config, storage)?))
    }

    pub fn with_context(ctx: CrawlContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.ctx.storage
    }

    /// Ensures every configured seed exists as a website
    ///
    /// # Returns
    ///
    /// The number of seeds that were accepted
    pub fn seed(&self) -> Result<usize, TrawlerError> {
        let mut seeded = 0;
        for seed in &self.ctx.config.seeds {
            let root = match parse_root(seed) {
                Ok(root) => root,
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", seed, e);
                    continue;
                }
            };
            let hostname = site_key(&root).ok_or(UrlError::MissingHost)?;
            with_storage(&self.ctx.storage, |s| {
                s.ensure_website(&hostname, root.as_str())
            })?;
            seeded += 1;
        }
        Ok(seeded)
    }

    /// Crawls pending websites until none remain or the sweep cap is hit
    ///
    /// Websites discovered during the sweep are picked up by later batches.
    /// A host is attempted at most once per sweep.
    pub async fn run_sweep(&self) -> Result<SweepReport, TrawlerError> {
        self.seed()?;

        let crawler = &self.ctx.config.crawler;
        let cap = crawler.max_sites_per_sweep as usize;
        let semaphore = Arc::new(Semaphore::new(crawler.concurrent_sites as usize));
        let mut attempted: HashSet<String> = HashSet::new();
        let mut report = SweepReport::default();

        loop {
            if attempted.len() >= cap {
                report.capped = true;
                tracing::info!("Sweep cap of {} sites reached", cap);
                break;
            }

            let pending = with_storage(&self.ctx.storage, |s| {
                s.pending_websites(crawler.batch_size as usize)
            })?;
            let batch: Vec<WebsiteRecord> = pending
                .into_iter()
                .filter(|w| !attempted.contains(&w.hostname))
                .take(cap - attempted.len())
                .collect();
            if batch.is_empty() {
                break;
            }

            tracing::info!("Starting batch of {} sites", batch.len());
            for website in &batch {
                attempted.insert(website.hostname.clone());
            }
            self.run_batch(batch, &semaphore, &mut report).await?;
        }

        tracing::info!(
            "Sweep finished: {} sites ({} failed), {} pages fetched, {} new buttons",
            report.sites_attempted,
            report.sites_failed,
            report.pages_fetched,
            report.buttons_new
        );
        Ok(report)
    }

    async fn run_batch(
        &self,
        batch: Vec<WebsiteRecord>,
        semaphore: &Arc<Semaphore>,
        report: &mut SweepReport,
    ) -> Result<(), TrawlerError> {
        let mut workers = JoinSet::new();

        for website in batch {
            report.sites_attempted += 1;

            let root = match parse_root(&website.root_url) {
                Ok(root) => root,
                Err(e) => {
                    tracing::warn!("Unusable root for {}: {}", website.hostname, e);
                    report.sites_failed += 1;
                    with_storage(&self.ctx.storage, |s| {
                        s.mark_website_scraped(&website.hostname)
                    })?;
                    continue;
                }
            };

            let ctx = self.ctx.clone();
            let semaphore = semaphore.clone();
            workers.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => crawl_site(&ctx, &root).await,
                    Err(e) => Err(TrawlerError::Task(e.to_string())),
                };
                (website.hostname, result)
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((_, Ok(site))) => report.add_site(&site),
                Ok((hostname, Err(e))) => {
                    report.sites_failed += 1;
                    tracing::warn!("Crawl of {} failed: {}", hostname, e);
                }
                Err(e) => {
                    report.sites_failed += 1;
                    tracing::error!("{}", TrawlerError::Task(e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Crawls one website now, even if it was scraped before
    ///
    /// Pages already recorded are not fetched again.
    pub async fn run_single(&self, input: &str) -> Result<SiteReport, TrawlerError> {
        let root = parse_root(input)?;
        let hostname = site_key(&root).ok_or(UrlError::MissingHost)?;

        with_storage(&self.ctx.storage, |s| {
            s.ensure_website(&hostname, root.as_str())?;
            s.reset_website(&hostname)
        })?;

        crawl_site(&self.ctx, &root).await
    }

    /// Runs sweeps forever, idling between sweeps that found nothing to do
    pub async fn run_forever(&self) -> Result<(), TrawlerError> {
        let idle = Duration::from_millis(self.ctx.config.crawler.idle_interval);

        loop {
            match self.run_sweep().await {
                Ok(report) if report.sites_attempted > 0 => continue,
                Ok(_) => tracing::debug!("No pending websites, idling for {:?}", idle),
                Err(e) => tracing::error!("Sweep failed: {}", e),
            }
            tokio::time::sleep(idle).await;
        }
    }
}
