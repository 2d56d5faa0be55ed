//! Error types for normalization.

use refcache_model::ModelError;
use thiserror::Error;

/// Result type for normalizer operations.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Errors raised while walking input against a schema.
///
/// `path` is a JSON pointer into the input (`/` for the root).
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// No union variant matches the input's tag.
    #[error("schema mismatch at {path}: {reason}")]
    SchemaMismatch { path: String, reason: String },

    /// An entity instance carries no usable primary key.
    #[error("missing primary key for {entity} at {path}")]
    MissingPrimaryKey { entity: String, path: String },

    /// The input has the wrong JSON type for the schema node.
    #[error("shape mismatch at {path}: expected {expected}, found {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Registry lookup failed (unknown entity type).
    #[error(transparent)]
    Model(#[from] ModelError),
}
