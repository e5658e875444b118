//! Configuration module for the trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use button_trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Page cap per site: {}", config.crawler.max_pages_per_site);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BlocklistConfig, Config, CrawlerConfig, OutputConfig, ServicesConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
