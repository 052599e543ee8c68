//! Buffered file-writer pool for raw article text
//!
//! Fetch workers hand finished articles to a bounded queue. A fixed set of
//! writer tasks drains it, each staging the file body in a buffer checked out
//! from a shared [`BufferPool`], so slow disks never stall a fetch.

use crate::storage::records::ArticleRecord;
use crate::storage::traits::{StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Highest numeric suffix tried before giving up on a slug
const MAX_SUFFIX: u32 = 10_000;

/// An article waiting to be written
#[derive(Debug, Clone)]
pub struct WriteTask {
    /// File stem, usually from [`crate::url::url_slug`]
    pub slug: String,
    /// Raw article text
    pub content: String,
    /// Record forwarded to the results writer once the file exists
    pub record: ArticleRecord,
}

/// Reusable byte buffers shared by the writer tasks
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
        }
    }

    /// Takes an empty buffer, allocating one if none is free
    pub fn checkout(&self) -> Vec<u8> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_size))
    }

    /// Returns a buffer for reuse
    ///
    /// Buffers that grew well past the configured size are dropped so one
    /// huge article does not pin its memory for the rest of the run.
    pub fn checkin(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > self.buffer_size.saturating_mul(4) {
            return;
        }
        buffer.clear();
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buffer);
    }

    /// Buffers currently available for checkout
    pub fn available(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Counters reported when the pool closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilePoolStats {
    pub written: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for FilePoolStats {
    fn add_assign(&mut self, other: Self) {
        self.written += other.written;
        self.failed += other.failed;
    }
}

/// Fixed set of tasks writing article files
pub struct FileWriterPool {
    tx: mpsc::Sender<WriteTask>,
    workers: Vec<JoinHandle<FilePoolStats>>,
}

impl FileWriterPool {
    /// Creates `dir` and starts `writers` tasks over a queue of `capacity`
    ///
    /// Every task forwards its records to `results` after writing the file.
    pub async fn start(
        dir: &Path,
        writers: usize,
        buffer_size: usize,
        capacity: usize,
        results: mpsc::Sender<ArticleRecord>,
    ) -> StorageResult<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let buffers = Arc::new(BufferPool::new(buffer_size));
        let dir = Arc::new(dir.to_path_buf());

        let workers = (0..writers.max(1))
            .map(|id| {
                tokio::spawn(file_worker(
                    id,
                    Arc::clone(&dir),
                    Arc::clone(&rx),
                    Arc::clone(&buffers),
                    results.clone(),
                ))
            })
            .collect();

        tracing::debug!("Started {} file writers for {}", writers.max(1), dir.display());
        Ok(Self { tx, workers })
    }

    /// Queues an article, waiting while the queue is full
    pub async fn submit(&self, task: WriteTask) -> StorageResult<()> {
        self.tx.send(task).await.map_err(|_| StorageError::Closed)
    }

    /// A sender that can be moved into fetch workers
    pub fn sender(&self) -> mpsc::Sender<WriteTask> {
        self.tx.clone()
    }

    /// Stops accepting work and waits until every queued file is written
    ///
    /// Other senders obtained from [`FileWriterPool::sender`] must already be
    /// dropped, otherwise the writers keep waiting for more work.
    pub async fn close(self) -> StorageResult<FilePoolStats> {
        drop(self.tx);

        let mut stats = FilePoolStats::default();
        for worker in self.workers {
            stats += worker
                .await
                .map_err(|e| StorageError::Task(e.to_string()))?;
        }
        Ok(stats)
    }
}

async fn file_worker(
    id: usize,
    dir: Arc<PathBuf>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<WriteTask>>>,
    buffers: Arc<BufferPool>,
    results: mpsc::Sender<ArticleRecord>,
) -> FilePoolStats {
    let mut stats = FilePoolStats::default();

    loop {
        // Hold the receiver lock only while waiting for the next task
        let next = rx.lock().await.recv().await;
        let Some(WriteTask {
            slug,
            content,
            mut record,
        }) = next
        else {
            break;
        };

        match write_content(&dir, &slug, &content, &buffers).await {
            Ok(path) => {
                record.content_path = path.to_string_lossy().into_owned();
                stats.written += 1;
            }
            Err(e) => {
                tracing::error!(writer = id, url = %record.url, "Error writing content: {}", e);
                stats.failed += 1;
            }
        }

        if results.send(record).await.is_err() {
            tracing::warn!(writer = id, "Results writer is gone, dropping record");
        }
    }

    tracing::trace!(writer = id, "File writer finished");
    stats
}

/// Writes one article under a fresh name and returns its path
async fn write_content(
    dir: &Path,
    slug: &str,
    content: &str,
    buffers: &BufferPool,
) -> std::io::Result<PathBuf> {
    write_content_with(dir, slug, content, buffers, |file| file).await
}

/// [`write_content`] over a sink built from the reserved file
///
/// A failed write removes the reserved file again, so no truncated article
/// is left behind and its name is free for the next collision.
async fn write_content_with<W, F>(
    dir: &Path,
    slug: &str,
    content: &str,
    buffers: &BufferPool,
    wrap: F,
) -> std::io::Result<PathBuf>
where
    W: AsyncWrite + Unpin,
    F: FnOnce(File) -> W,
{
    let (path, file) = reserve_content_path(dir, slug).await?;

    let mut buffer = buffers.checkout();
    buffer.extend_from_slice(content.as_bytes());
    if !content.ends_with('\n') {
        buffer.push(b'\n');
    }

    let written = write_staged(BufWriter::new(wrap(file)), &buffer).await;
    buffers.checkin(buffer);

    match written {
        Ok(()) => Ok(path),
        Err(e) => {
            if let Err(remove) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Could not remove partial file {}: {}", path.display(), remove);
            }
            Err(e)
        }
    }
}

/// Writes `bytes` and closes the sink
async fn write_staged<W>(mut out: BufWriter<W>, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(bytes).await?;
    out.flush().await?;
    out.shutdown().await
}

/// Creates `<dir>/<slug>.txt`, or `<slug>_1.txt`, `<slug>_2.txt`, ... if taken
///
/// The file is created with create-exclusive semantics, so two concurrent
/// callers can never be handed the same path.
pub async fn reserve_content_path(dir: &Path, slug: &str) -> std::io::Result<(PathBuf, File)> {
    tokio::fs::create_dir_all(dir).await?;

    for suffix in 0..=MAX_SUFFIX {
        let name = if suffix == 0 {
            format!("{}.txt", slug)
        } else {
            format!("{}_{}.txt", slug, suffix)
        };
        let path = dir.join(name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for slug '{}'", slug),
    ))
}
