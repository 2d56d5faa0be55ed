//! Error types for the schema model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or querying a schema registry.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A schema refers to an entity type that was never registered.
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    /// An entity type was registered twice.
    #[error("entity type already registered: {0}")]
    DuplicateEntity(String),

    /// A custom primary key was declared but no handler provides it.
    #[error("entity type {0} uses a custom primary key but has no handler")]
    MissingHandler(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
