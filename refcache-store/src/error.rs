//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while writing or persisting a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Normalizing a response failed; the store is unchanged.
    #[error("normalization error: {0}")]
    Normalize(#[from] refcache_normalizr::NormalizeError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
