//! Results table written by a single serializing task
//!
//! Rows are appended in arrival order, which need not match the order of
//! the input URL list.

use crate::storage::traits::{StorageError, StorageResult};
use serde::Serialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Column names, in output order
pub const RECORD_HEADER: [&str; 6] = [
    "url",
    "title",
    "author",
    "published_at",
    "content_path",
    "tags",
];

/// One successfully fetched article
///
/// Fields serialize in [`RECORD_HEADER`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub author: String,
    pub published_at: String,
    /// Path of the raw-text file; empty if it could not be written
    pub content_path: String,
    /// Tag names joined by `/`
    pub tags: String,
}

impl ArticleRecord {
    /// Encodes the record as one CSV line, including the line terminator
    pub fn to_row(&self) -> StorageResult<Vec<u8>> {
        encode(|writer| writer.serialize(self))
    }
}

/// Runs `write` against an in-memory CSV writer and returns the bytes
///
/// Rows are encoded one at a time so the async file writer never blocks on
/// the synchronous `csv` writer.
fn encode<F>(write: F) -> StorageResult<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    write(&mut writer)?;
    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))
}

fn header_row() -> StorageResult<Vec<u8>> {
    encode(|writer| writer.write_record(RECORD_HEADER))
}

/// Handle to the results-writer task
pub struct RecordWriter {
    tx: mpsc::Sender<ArticleRecord>,
    task: JoinHandle<StorageResult<usize>>,
}

impl RecordWriter {
    /// Creates (truncating) the results file and writes the header row
    ///
    /// Failing to create the file is a setup error and is returned here,
    /// before any fetching starts.
    pub async fn create(path: &Path, capacity: usize) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(path).await?;
        Self::spawn(file, capacity).await
    }

    /// Writes the header to `sink` and starts the writer task over it
    pub async fn spawn<W>(sink: W, capacity: usize) -> StorageResult<Self>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut out = BufWriter::new(sink);
        out.write_all(&header_row()?).await?;
        out.flush().await?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(write_records(out, rx));

        Ok(Self { tx, task })
    }

    /// A sender for producers; the writer stops once every sender is gone
    pub fn sender(&self) -> mpsc::Sender<ArticleRecord> {
        self.tx.clone()
    }

    /// Waits for every outstanding record, then closes the file
    ///
    /// Returns the number of rows written. All senders handed out with
    /// [`RecordWriter::sender`] must be dropped for this to return.
    pub async fn finish(self) -> StorageResult<usize> {
        drop(self.tx);
        self.task
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

async fn write_records<W>(
    mut out: BufWriter<W>,
    mut rx: mpsc::Receiver<ArticleRecord>,
) -> StorageResult<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut rows = 0;

    while let Some(record) = rx.recv().await {
        let written = match record.to_row() {
            Ok(row) => out.write_all(&row).await.map_err(StorageError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::error!("Error writing record for {}: {}", record.url, e);
            continue;
        }
        rows += 1;

        // Flush whenever the queue runs dry so rows reach disk promptly
        if rx.is_empty() {
            out.flush().await?;
        }
    }

    out.flush().await?;
    out.shutdown().await?;
    Ok(rows)
}
