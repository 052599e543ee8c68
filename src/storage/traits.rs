//! Storage traits and error types
//!
//! This module defines the sink interface crawl workers write discovered
//! URLs into, and the error type shared by the writers.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Writer task failed: {0}")]
    Task(String),

    #[error("Writer is closed")]
    Closed,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for discovered URLs
///
/// Implementations must accept submissions from many tasks at once and must
/// not make a producer wait on disk I/O.
#[async_trait]
pub trait LinkSink: Send + Sync {
    /// Submits one URL; returns `false` if it was dropped
    async fn submit(&self, url: String) -> bool;
}

/// In-memory sink, handy for tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySink {
    urls: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far, in arrival order
    pub fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LinkSink for MemorySink {
    async fn submit(&self, url: String) -> bool {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
        true
    }
}
