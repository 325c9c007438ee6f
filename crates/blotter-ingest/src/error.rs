//! Error types for the ingestion pipeline
//!
//! Each stage has its own error enum so callers can tell a failed run
//! (fetch, connection, commit) from a recoverable per-record problem.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Top-level error for a pipeline run
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    /// Shared library error (identifier validation, IO, serialization)
    #[error(transparent)]
    Common(#[from] blotter_common::BlotterError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Staging sink failure that ends the run
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Read-only query failure outside the staging sink
    #[error("Database error: {0}. Check DATABASE_URL and connection settings.")]
    Database(#[from] sqlx::Error),
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Why a fetch produced no records
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not a JSON array
    #[error("response from {url} is not a JSON array: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Staging sink failures
///
/// `Insert` is recovered per record by the loader; every other variant is
/// fatal for the run.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("staging connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("failed to clear staging table {table}: {source}")]
    Clear {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("row for event '{event_id}' rejected: {reason}")]
    Insert { event_id: String, reason: String },

    #[error("commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("staging query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl SinkError {
    /// Create an insert rejection for one event
    pub fn insert(event_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Insert {
            event_id: event_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the loader may skip this failure and keep going
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_insert_failures_are_record_level() {
        assert!(SinkError::insert("42", "invalid input syntax for type json").is_record_level());
        assert!(!SinkError::Commit(sqlx::Error::PoolClosed).is_record_level());
        assert!(!SinkError::Connection(sqlx::Error::PoolTimedOut).is_record_level());
    }

    #[test]
    fn test_insert_error_names_the_event() {
        let err = SinkError::insert("512034", "value too long");
        assert_eq!(err.to_string(), "row for event '512034' rejected: value too long");
    }
}
