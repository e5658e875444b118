//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::PageState;
use crate::storage::Storage;
use crate::TrawlerError;
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    pub total_websites: u64,
    pub scraped_websites: u64,
    pub pending_websites: u64,

    /// Total number of recorded pages, sentinels included
    pub total_pages: u64,

    /// Count of pages by state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Distinct buttons (by content hash)
    pub buttons: u64,

    /// Button appearances across pages
    pub sightings: u64,

    /// (word, page) rows in the keyword index
    pub keywords: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(TrawlerError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, TrawlerError> {
    let counts = storage.counts()?;

    let mut pages_by_state = HashMap::new();
    for state in PageState::ALL {
        let count = storage.count_pages_by_state(state)?;
        if count > 0 {
            pages_by_state.insert(state, count);
        }
    }

    Ok(CrawlStatistics {
        total_websites: counts.websites,
        scraped_websites: counts.scraped_websites,
        pending_websites: counts.pending_websites,
        total_pages: counts.pages,
        pages_by_state,
        buttons: counts.buttons,
        sightings: counts.sightings,
        keywords: counts.keywords,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Websites:");
    println!("  Total: {}", stats.total_websites);
    println!("  Scraped: {}", stats.scraped_websites);
    println!("  Pending: {}", stats.pending_websites);
    println!();

    println!("Pages: {}", stats.total_pages);
    // Sort states by count (descending)
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        println!(
            "  {}: {} ({:.1}%)",
            state,
            count,
            percentage(*count, stats.total_pages)
        );
    }
    println!();

    println!("Buttons: {}", stats.buttons);
    println!("  Sightings: {}", stats.sightings);
    println!("Keyword entries: {}", stats.keywords);
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}
