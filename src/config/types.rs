use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Harvest
///
/// Every section and key is optional; anything left out falls back to the
/// built-in defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub seed: SeedConfig,
    pub writer: WriterConfig,
    pub fetch: FetchConfig,
}

/// Stage-1 crawl behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent crawl workers
    pub workers: usize,

    /// Minimum time between requests to the same domain (milliseconds)
    pub politeness_delay_ms: u64,

    /// Maximum depth to follow links from the seeds
    pub max_depth: u32,

    /// Whether discovered links are fed back into the frontier
    pub follow_links: bool,

    /// Per-request network timeout (seconds)
    pub request_timeout_secs: u64,

    /// CSS selector for the article links on a rendered listing
    pub link_selector: String,

    /// Upper bound on content-expansion steps per page
    pub max_scroll_attempts: u32,

    /// Consecutive no-growth measurements that end content expansion
    pub stable_scroll_rounds: u32,

    /// Viewport advertised to the server
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 100,
            politeness_delay_ms: 1000,
            max_depth: 3,
            follow_links: false,
            request_timeout_secs: 10,
            link_selector: "a[aria-labelledby]".to_string(),
            max_scroll_attempts: 20,
            stable_scroll_rounds: 3,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where the crawl starts
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SeedConfig {
    /// Page listing the top-level categories; empty disables discovery
    pub categories_url: String,

    /// CSS selector for category links on that page
    pub category_selector: String,

    /// Additional depth-0 seeds
    pub urls: Vec<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            categories_url: "https://dev.to/tags".to_string(),
            category_selector: "a[href^='/t/']".to_string(),
            urls: Vec::new(),
        }
    }
}

/// Batched URL-list writer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WriterConfig {
    /// Newline-delimited output of discovered URLs
    pub url_list_path: PathBuf,

    /// Flush once this many entries are pending
    pub batch_size: usize,

    /// Flush at least this often while entries are pending (milliseconds)
    pub flush_interval_ms: u64,

    /// Capacity of the submission channel
    pub buffer_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            url_list_path: PathBuf::from("devto_urls.txt"),
            batch_size: 100,
            flush_interval_ms: 1000,
            buffer_capacity: 1000,
        }
    }
}

impl WriterConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Stage-2 fetch pipeline settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Number of concurrent fetch workers
    pub workers: usize,

    /// Per-request network timeout (seconds)
    pub timeout_secs: u64,

    /// Attempts per URL, including the first one
    pub retries: u32,

    /// Interval of the shared rate limiter (milliseconds)
    pub rate_interval_ms: u64,

    /// Backoff unit; attempt `n` sleeps `n * base` after a timeout (milliseconds)
    pub backoff_base_ms: u64,

    /// File-writer tasks; 0 uses the available parallelism
    pub file_writers: usize,

    /// Size of each pooled write buffer (bytes)
    pub write_buffer_bytes: usize,

    /// Directory receiving one text file per article
    pub content_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            timeout_secs: 15,
            retries: 3,
            rate_interval_ms: 500,
            backoff_base_ms: 1000,
            file_writers: 0,
            write_buffer_bytes: 32 * 1024,
            content_dir: PathBuf::from("posts"),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Resolves the `0 = auto` file-writer count
    pub fn effective_file_writers(&self) -> usize {
        if self.file_writers > 0 {
            return self.file_writers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}
