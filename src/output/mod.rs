//! Output module for reporting on the crawl database
//!
//! This module handles:
//! - Loading website, page and button counts from storage
//! - Printing them for the `stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
