use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the songs query operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Rejected during validation, before the cache or the store is touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("catalog store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl QueryError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidArgument(_) => "invalid_argument",
            QueryError::StoreUnavailable(_) => "store_unavailable",
            QueryError::Timeout { .. } => "timeout",
        }
    }
}

/// A hydrated record that does not match what the ranking phase promised.
/// Logged and dropped, never returned to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("album {album_id}: {reason}")]
pub struct MappingInconsistency {
    pub album_id: String,
    pub reason: &'static str,
}
