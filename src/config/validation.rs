use crate::config::types::{Config, CrawlerConfig, FetchConfig, SeedConfig, WriterConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_seed_config(&config.seed)?;
    validate_writer_config(&config.writer)?;
    validate_fetch_config(&config.fetch)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "crawler.workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.request-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.stable_scroll_rounds == 0 {
        return Err(ConfigError::Validation(
            "crawler.stable-scroll-rounds must be > 0".to_string(),
        ));
    }

    validate_selector(&config.link_selector)?;

    Ok(())
}

/// Validates the seed section
fn validate_seed_config(config: &SeedConfig) -> Result<(), ConfigError> {
    if !config.categories_url.is_empty() {
        validate_http_url(&config.categories_url)?;
        validate_selector(&config.category_selector)?;
    }

    for seed in &config.urls {
        validate_http_url(seed)?;
    }

    Ok(())
}

/// Validates URL-list writer configuration
fn validate_writer_config(config: &WriterConfig) -> Result<(), ConfigError> {
    if config.url_list_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "writer.url-list-path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "writer.batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.flush_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "writer.flush-interval-ms must be > 0".to_string(),
        ));
    }

    if config.buffer_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "writer.buffer-capacity must be >= 1, got {}",
            config.buffer_capacity
        )));
    }

    Ok(())
}

/// Validates fetch pipeline configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch.workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch.retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch.timeout-secs must be > 0".to_string(),
        ));
    }

    // tokio intervals panic on a zero period
    if config.rate_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch.rate-interval-ms must be > 0".to_string(),
        ));
    }

    if config.write_buffer_bytes == 0 {
        return Err(ConfigError::Validation(
            "fetch.write-buffer-bytes must be > 0".to_string(),
        ));
    }

    if config.content_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "fetch.content-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "URL '{}' must use http or https",
            raw
        )));
    }

    Ok(())
}

/// Validates that a CSS selector parses
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
