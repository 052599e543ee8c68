//! Fetch module for stage 2 (article download and extraction)
//!
//! This module contains:
//! - The shared rate limiter
//! - Retry with linear backoff and error classification
//! - The HTTP fetcher and the content extractor
//! - The pipeline tying them to the storage writers

mod extractor;
mod fetcher;
mod pipeline;
mod rate_limiter;
mod retry;

pub use extractor::{Article, ContentExtractor, DevToExtractor};
pub use fetcher::{build_fetch_client, Fetcher};
pub use pipeline::{read_url_list, run_pipeline, Pipeline, PipelineStats};
pub use rate_limiter::RateLimiter;
pub use retry::{fetch_with_retry, FetchError, RetryPolicy};
