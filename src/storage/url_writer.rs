//! Batched, append-only writer for the discovered-URL list
//!
//! Producers hand URLs to a bounded channel; a single background task owns
//! the file, collects URLs into a batch and writes the batch when it is full
//! or when the flush interval passes, whichever comes first.

use crate::config::WriterConfig;
use crate::storage::traits::{LinkSink, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Counters reported when the writer closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Entries written successfully
    pub written: usize,
    /// Entries lost to failed writes (not retried)
    pub failed: usize,
    /// Number of batch flushes
    pub flushes: usize,
}

/// Owner of the background writer task
///
/// Hand [`UrlWriter::handle`] clones to producers, then call
/// [`UrlWriter::close`] once they are done.
pub struct UrlWriter {
    handle: UrlWriterHandle,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<WriterStats>,
}

/// Cheap, cloneable submission side of a [`UrlWriter`]
#[derive(Clone)]
pub struct UrlWriterHandle {
    tx: mpsc::Sender<String>,
    shutdown: watch::Receiver<bool>,
}

impl UrlWriter {
    /// Opens (or creates) `path` for appending and starts the writer task
    pub async fn open(path: &Path, config: &WriterConfig) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        tracing::info!("Writing discovered URLs to {}", path.display());
        Ok(Self::spawn(
            file,
            config.batch_size,
            config.flush_interval(),
            config.buffer_capacity,
        ))
    }

    /// Starts a writer over any async sink
    pub fn spawn<W>(
        sink: W,
        batch_size: usize,
        flush_interval: Duration,
        buffer_capacity: usize,
    ) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer_capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = BatchWorker {
            rx,
            shutdown: shutdown_rx.clone(),
            out: BufWriter::new(sink),
            batch: Vec::with_capacity(batch_size.max(1)),
            batch_size: batch_size.max(1),
            stats: WriterStats::default(),
        };
        let task = tokio::spawn(worker.run(flush_interval));

        Self {
            handle: UrlWriterHandle {
                tx,
                shutdown: shutdown_rx,
            },
            shutdown,
            task,
        }
    }

    /// Submission handle for producers
    pub fn handle(&self) -> UrlWriterHandle {
        self.handle.clone()
    }

    /// Submits a URL through the owner's own handle
    pub async fn write(&self, url: String) -> bool {
        self.handle.write(url).await
    }

    /// Stops the writer, flushing everything that was accepted
    ///
    /// Returns once the final batch is on disk and the file is released.
    pub async fn close(self) -> StorageResult<WriterStats> {
        let _ = self.shutdown.send(true);
        drop(self.handle);

        let stats = self
            .task
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?;

        tracing::info!(
            "URL writer closed: {} written, {} failed, {} flushes",
            stats.written,
            stats.failed,
            stats.flushes
        );
        Ok(stats)
    }
}

impl UrlWriterHandle {
    /// Queues a URL for writing
    ///
    /// Returns immediately while the channel has room. When it is full the
    /// call waits for room, unless the writer is shutting down, in which case
    /// the URL is dropped and `false` is returned.
    pub async fn write(&self, url: String) -> bool {
        let url = match self.tx.try_send(url) {
            Ok(()) => return true,
            Err(TrySendError::Closed(url)) => {
                tracing::debug!("URL writer closed, dropping {}", url);
                return false;
            }
            Err(TrySendError::Full(url)) => url,
        };

        let mut shutdown = self.shutdown.clone();
        let shutting_down = async move {
            let _ = shutdown.wait_for(|closing| *closing).await;
        };

        tokio::select! {
            sent = self.tx.send(url) => sent.is_ok(),
            _ = shutting_down => {
                tracing::debug!("URL writer shutting down, dropping submission");
                false
            }
        }
    }
}

#[async_trait]
impl LinkSink for UrlWriterHandle {
    async fn submit(&self, url: String) -> bool {
        self.write(url).await
    }
}

/// State owned by the background task
struct BatchWorker<W> {
    rx: mpsc::Receiver<String>,
    shutdown: watch::Receiver<bool>,
    out: BufWriter<W>,
    batch: Vec<String>,
    batch_size: usize,
    stats: WriterStats,
}

impl<W: AsyncWrite + Unpin + Send> BatchWorker<W> {
    async fn run(mut self, flush_interval: Duration) -> WriterStats {
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(url) => {
                        self.batch.push(url);
                        if self.batch.len() >= self.batch_size {
                            self.flush().await;
                            ticker.reset();
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // Refuse new submissions, then drain what was already accepted
        self.rx.close();
        while let Some(url) = self.rx.recv().await {
            self.batch.push(url);
            if self.batch.len() >= self.batch_size {
                self.flush().await;
            }
        }
        if !self.batch.is_empty() {
            self.flush().await;
        }

        if let Err(e) = self.out.shutdown().await {
            tracing::error!("Error closing URL list: {}", e);
        }

        self.stats
    }

    /// Writes the pending batch; failures are logged and the batch is dropped
    async fn flush(&mut self) {
        let count = self.batch.len();
        let mut written = 0;

        for url in self.batch.drain(..) {
            let line = format!("{}\n", url);
            match self.out.write_all(line.as_bytes()).await {
                Ok(()) => written += 1,
                Err(e) => tracing::error!("Error writing URL to file: {}", e),
            }
        }

        if let Err(e) = self.out.flush().await {
            tracing::error!("Error flushing URL batch of {}: {}", count, e);
            self.stats.failed += count;
        } else {
            self.stats.written += written;
            self.stats.failed += count - written;
        }

        self.stats.flushes += 1;
        tracing::trace!("Flushed {} URLs", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn config(batch_size: usize, flush_interval_ms: u64, buffer_capacity: usize) -> WriterConfig {
        WriterConfig {
            url_list_path: "unused".into(),
            batch_size,
            flush_interval_ms,
            buffer_capacity,
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_close_persists_every_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let writer = UrlWriter::open(&path, &config(100, 1000, 1000)).await.unwrap();

        for i in 0..250 {
            assert!(writer.write(format!("https://dev.to/post-{}", i)).await);
        }
        let stats = writer.close().await.unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 250);
        assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 250);
        assert_eq!(stats.written, 250);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_small_buffer_many_producers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let writer = UrlWriter::open(&path, &config(7, 5, 3)).await.unwrap();

        let producers: Vec<_> = (0..5)
            .map(|p| {
                let handle = writer.handle();
                tokio::spawn(async move {
                    for i in 0..50 {
                        assert!(handle.write(format!("https://x.example/{}/{}", p, i)).await);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        writer.close().await.unwrap();
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 250);
        assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 250);
    }

    #[tokio::test]
    async fn test_interval_flush_before_batch_fills() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let writer = UrlWriter::open(&path, &config(100, 50, 100)).await.unwrap();

        writer.write("https://dev.to/a".to_string()).await;
        writer.write("https://dev.to/b".to_string()).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(read_lines(&path), vec!["https://dev.to/a", "https://dev.to/b"]);
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "https://dev.to/old\n").unwrap();

        let writer = UrlWriter::open(&path, &config(10, 1000, 10)).await.unwrap();
        writer.write("https://dev.to/new".to_string()).await;
        writer.close().await.unwrap();

        assert_eq!(read_lines(&path), vec!["https://dev.to/old", "https://dev.to/new"]);
    }

    #[tokio::test]
    async fn test_write_after_close_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let writer = UrlWriter::open(&path, &config(10, 1000, 10)).await.unwrap();
        let handle = writer.handle();

        writer.close().await.unwrap();
        assert!(!handle.write("https://dev.to/late".to_string()).await);
    }

    #[tokio::test]
    async fn test_blocked_producer_released_on_shutdown() {
        // A sink that never accepts bytes keeps the worker stuck in a flush,
        // so the channel fills up and the next write has to wait.
        struct Stalled;
        impl AsyncWrite for Stalled {
            fn poll_write(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
                _: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                std::task::Poll::Pending
            }
            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Pending
            }
            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Pending
            }
        }

        let writer = Arc::new(UrlWriter::spawn(Stalled, 1, Duration::from_secs(60), 1));
        let handle = writer.handle();

        // First entry fills the batch and the stalled flush begins, second fills the channel
        handle.write("https://a.example/1".to_string()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.write("https://a.example/2".to_string()).await;

        let blocked = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.write("https://a.example/3".to_string()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        let _ = writer.shutdown.send(true);
        let result = tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .expect("producer stayed blocked during shutdown")
            .unwrap();
        assert!(!result);
    }
}
