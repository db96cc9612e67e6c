//! Error types for FOLIO operations.
//!
//! The query engine itself never fails: malformed paging or sorting input is
//! coerced instead. Every [`Error`] therefore originates either from a
//! dispatch precondition or from an external collaborator.

use thiserror::Error;

use crate::dispatch::DispatchReport;
use crate::mail::TransportError;
use crate::source::SourceError;

/// Error type for FOLIO operations.
///
/// Display output is the bare message, since it is surfaced verbatim to
/// HTTP callers as `{ "ok": false, "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The caller supplied a malformed or incomplete request.
    ///
    /// Never retried; the message says what to correct.
    #[error("{0}")]
    InvalidInput(String),

    /// The request named a collection the record source does not know.
    #[error("{0}")]
    NotFound(String),

    /// The record source or mail transport reported a failure.
    #[error("{0}")]
    Upstream(String),

    /// A required server-side setting (sender address, API token) is missing.
    #[error("{0}")]
    Configuration(String),

    /// A batch send failed part-way through a bulk dispatch.
    ///
    /// `report` holds the counts confirmed before the failing batch: batches
    /// after it were never attempted.
    #[error("{reason}")]
    DispatchFailed {
        reason: String,
        report: DispatchReport,
    },
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(_) => Error::NotFound(err.to_string()),
            SourceError::Unavailable(_) => Error::Upstream(err.to_string()),
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Upstream(err.reason)
    }
}

/// Result type alias for FOLIO operations.
pub type Result<T> = std::result::Result<T, Error>;
