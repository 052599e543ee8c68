//! Storage module for persisting harvest output
//!
//! This module handles every file the harvester writes:
//! - The append-only discovered-URL list (batched, single writer task)
//! - One raw-text file per article (buffered writer pool)
//! - The header-first results table (single serializing writer)

mod file_pool;
mod records;
mod traits;
mod url_writer;

pub use file_pool::{reserve_content_path, BufferPool, FilePoolStats, FileWriterPool, WriteTask};
pub use records::{ArticleRecord, RecordWriter, RECORD_HEADER};
pub use traits::{LinkSink, MemorySink, StorageError, StorageResult};
pub use url_writer::{UrlWriter, UrlWriterHandle, WriterStats};
