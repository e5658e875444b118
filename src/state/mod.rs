//! State tracking for the crawler
//!
//! This module defines the terminal states of recorded pages and the
//! process-wide cache shared by site workers.

mod cache;
mod page_state;

pub use cache::{CrawlCache, ImageVerdict};
pub use page_state::PageState;
