//! Stage-2 fetch pipeline
//!
//! URLs flow through a bounded queue to a fixed pool of fetch workers. Every
//! attempt passes the shared rate limiter; fetched pages are extracted in the
//! worker, article text goes to the file-writer pool, and the file writers
//! pass the finished record on to the single results writer.

use crate::config::FetchConfig;
use crate::fetch::extractor::{ContentExtractor, DevToExtractor};
use crate::fetch::fetcher::Fetcher;
use crate::fetch::rate_limiter::RateLimiter;
use crate::fetch::retry::{fetch_with_retry, FetchError, RetryPolicy};
use crate::storage::{FilePoolStats, FileWriterPool, RecordWriter, WriteTask};
use crate::url::{parse_http_url, url_slug};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

/// Summary of a pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// URLs read from the input
    pub total: usize,
    /// URLs fetched and extracted
    pub succeeded: usize,
    /// URLs abandoned after a permanent error or exhausted retries
    pub failed: usize,
    /// Article files written / not written
    pub files: FilePoolStats,
    /// Rows in the results table, header excluded
    pub rows: usize,
    pub elapsed: Duration,
}

/// Reads a newline-delimited URL list, skipping blank lines
pub async fn read_url_list(path: &Path) -> std::io::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Fetches every URL in `urls` and writes the results table to `output`
///
/// Failing to create `output` or the content directory is returned as an
/// error before any request is made; per-URL failures are only counted.
pub async fn run_pipeline(
    config: &FetchConfig,
    urls: Vec<String>,
    output: &Path,
) -> Result<PipelineStats, HarvestError> {
    let fetcher = Fetcher::from_config(config)?;
    let extractor = Arc::new(DevToExtractor::new()?);
    Pipeline::new(config.clone(), fetcher, extractor)
        .run(urls, output)
        .await
}

/// A configured stage-2 run
pub struct Pipeline {
    config: FetchConfig,
    fetcher: Fetcher,
    extractor: Arc<dyn ContentExtractor>,
}

impl Pipeline {
    pub fn new(config: FetchConfig, fetcher: Fetcher, extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            config,
            fetcher,
            extractor,
        }
    }

    pub async fn run(self, urls: Vec<String>, output: &Path) -> Result<PipelineStats, HarvestError> {
        let start_time = Instant::now();
        let workers = self.config.workers.max(1);
        let queue_capacity = workers * 2;

        let records = RecordWriter::create(output, queue_capacity).await?;
        let writers = self.config.effective_file_writers();
        let files = FileWriterPool::start(
            &self.config.content_dir,
            writers,
            self.config.write_buffer_bytes,
            writers * 2,
            records.sender(),
        )
        .await?;

        tracing::info!(
            "Fetching {} URLs with {} workers, {} file writers, one request per {:?}",
            urls.len(),
            workers,
            writers,
            self.config.rate_interval()
        );

        let limiter = Arc::new(RateLimiter::new(self.config.rate_interval()));
        let policy = RetryPolicy {
            attempts: self.config.retries,
            backoff_base: self.config.backoff_base(),
        };

        let (url_tx, url_rx) = mpsc::channel::<String>(queue_capacity);
        let url_rx = Arc::new(Mutex::new(url_rx));

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let worker = FetchWorker {
                    id,
                    urls: Arc::clone(&url_rx),
                    fetcher: self.fetcher.clone(),
                    extractor: Arc::clone(&self.extractor),
                    limiter: Arc::clone(&limiter),
                    policy,
                    files: files.sender(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let total = urls.len();
        for url in urls {
            if url_tx.send(url).await.is_err() {
                tracing::error!("All fetch workers stopped early");
                break;
            }
        }
        // Closing the queue lets the workers drain it and exit
        drop(url_tx);

        let mut stats = PipelineStats {
            total,
            ..PipelineStats::default()
        };
        for handle in handles {
            match handle.await {
                Ok(tally) => {
                    stats.succeeded += tally.succeeded;
                    stats.failed += tally.failed;
                }
                Err(e) => tracing::error!("Fetch worker panicked: {}", e),
            }
        }

        stats.files = files.close().await?;
        stats.rows = records.finish().await?;
        stats.elapsed = start_time.elapsed();

        tracing::info!(
            "Pipeline finished: {} succeeded, {} failed of {} URLs in {:?}",
            stats.succeeded,
            stats.failed,
            stats.total,
            stats.elapsed
        );
        if stats.files.failed > 0 {
            tracing::warn!("{} article files could not be written", stats.files.failed);
        }

        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: usize,
    failed: usize,
}

struct FetchWorker {
    id: usize,
    urls: Arc<Mutex<mpsc::Receiver<String>>>,
    fetcher: Fetcher,
    extractor: Arc<dyn ContentExtractor>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    files: mpsc::Sender<WriteTask>,
}

impl FetchWorker {
    async fn run(self) -> Tally {
        let mut tally = Tally::default();
        tracing::debug!(worker = self.id, "Fetch worker started");

        loop {
            let next = self.urls.lock().await.recv().await;
            let Some(url) = next else {
                break;
            };

            match self.process(&url).await {
                Ok(task) => {
                    if self.files.send(task).await.is_err() {
                        tracing::error!(worker = self.id, url = %url, "File writers are gone");
                        tally.failed += 1;
                        continue;
                    }
                    tracing::debug!(worker = self.id, url = %url, "Extracted");
                    tally.succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, url = %url, "Failed: {}", e);
                    tally.failed += 1;
                }
            }
        }

        tracing::debug!(worker = self.id, "Fetch worker finished");
        tally
    }

    /// Fetches and extracts one URL
    async fn process(&self, url: &str) -> Result<WriteTask, FetchError> {
        parse_http_url(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let html = fetch_with_retry(&self.policy, &self.limiter, |attempt| {
            tracing::trace!(worker = self.id, url = %url, attempt, "Fetching");
            self.fetcher.fetch(url)
        })
        .await?;

        let (record, content) = self.extractor.extract(&html, url)?.into_record(url);
        Ok(WriteTask {
            slug: url_slug(url),
            content,
            record,
        })
    }
}
