//! Crawler module for site traversal and button collection
//!
//! This module contains the core crawling logic, including:
//! - HTTP transport and page sources (markup and render worker)
//! - HTML parsing and link/image extraction
//! - The per-site frontier with politeness delay
//! - Button classification and text indexing
//! - Sweep coordination across many sites

mod classifier;
mod coordinator;
mod embeddings;
mod extract;
mod fetcher;
mod frontier;
mod parser;
mod render_worker;
mod site;

pub use classifier::{
    content_hash, image_dimensions, is_button_size, ButtonClassifier, ImageOutcome,
    BUTTON_HEIGHT, BUTTON_WIDTH,
};
pub use coordinator::{Coordinator, SweepReport};
pub use embeddings::{EmbeddingClient, EmbeddingError, EMBEDDED_FIELDS};
pub use extract::{
    reconcile, FallbackSource, ImageCandidate, MarkupSource, PageExtraction, PageSource, RawPage,
    SourceError,
};
pub use fetcher::{
    build_http_client, sentinel_for_status, FetchError, FetchResult, FetchedBytes, HttpTransport,
    RobotsFetch, Transport,
};
pub use frontier::{effective_delay, Frontier};
pub use parser::{parse_markup, ParsedMarkup, RawImage, RawLink};
pub use render_worker::RenderWorkerSource;
pub use site::{crawl_site, CrawlContext, SiteOutcome, SiteReport};
