//! Harvest: a polite two-stage article harvester
//!
//! Stage 1 crawls category pages through a priority frontier with per-domain
//! politeness and records every discovered article URL to a newline-delimited
//! list. Stage 2 reads that list, fetches each article under a shared rate
//! limit with retry, and persists structured records plus raw article text.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod logging;
pub mod storage;
pub mod url;
pub mod useragent;

use thiserror::Error;

/// Main error type for Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Extraction error for {url}: {message}")]
    Extract { url: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlItem, Frontier};
pub use url::{extract_domain, normalize_url, url_slug};
pub use useragent::pick_user_agent;
