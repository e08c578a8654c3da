//! Data-access error model.

use thiserror::Error;

/// Result type returned by every store and cache operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Fault raised by a backing store (user rows, permission graph, cache).
///
/// The authorization core never retries these; retry policy, if any, belongs
/// to the store client. A denied authorization is a normal `false` result,
/// never a `StoreError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or is unusable (connection refused,
    /// poisoned lock, missing database file).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A query or write failed after the backend was reached.
    #[error("store query failed: {0}")]
    Query(String),

    /// A row was fetched but could not be decoded into its record type.
    #[error("store row decode failed: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
