//! Core type definitions for refcache.
//!
//! This crate defines the small, schema-agnostic types shared by every
//! other crate in the workspace:
//! - Entity identity keys (`type`, primary key)
//! - Request fingerprints indexing cached results and their metadata
//! - Millisecond wall-clock timestamps for cache metadata
//!
//! Nothing here knows about schemas or JSON shapes; that lives in
//! `refcache-model` and `refcache-normalizr`.

mod fingerprint;
mod key;
mod timestamp;

pub use fingerprint::Fingerprint;
pub use key::EntityKey;
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when parsing the core types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid entity key: {0}")]
    InvalidEntityKey(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
