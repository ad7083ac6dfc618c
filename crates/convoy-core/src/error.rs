//! Error taxonomy for the store-side operations.

use thiserror::Error;

/// Failures surfaced by the store's catalog and state operations.
///
/// `Validation` maps to HTTP 400 and is never retried; `Storage` maps to
/// HTTP 500 and is surfaced to the caller without a partial result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}
