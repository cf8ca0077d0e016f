//! Configuration module for the ingestion pipeline
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use partselect_ingest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ingest.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig, DEFAULT_SEEDS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
