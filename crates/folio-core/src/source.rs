//! # Record Sources
//!
//! The read side of the backing document store. A source returns a whole
//! collection per call; there is no filter pushdown, so every query runs
//! in-process over a fresh snapshot.

use thiserror::Error;

use crate::record::Record;

/// Failure reported by a [`RecordSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The named collection does not exist.
    #[error("Unknown resource '{0}'")]
    NotFound(String),

    /// The store could not be read.
    #[error("record source unavailable: {0}")]
    Unavailable(String),
}

/// A query-capable store exposing "fetch all records in collection X".
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch every record of `collection`, in store order.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>, SourceError>;
}
