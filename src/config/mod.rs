//! Configuration module for Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a partial file (or none at all) is valid.
//!
//! # Example
//!
//! ```no_run
//! use harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl workers: {}", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetchConfig, SeedConfig, WriterConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
