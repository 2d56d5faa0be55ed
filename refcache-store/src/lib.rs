//! Cache store and selector for refcache.
//!
//! # Architecture
//!
//! - [`Store`] is an immutable, versioned snapshot of `entities`, `results`
//!   and `meta`. Every write returns a new snapshot; tables are shared
//!   through `Arc` and copied only when a write touches them.
//! - [`select`] reads one fingerprint out of a snapshot, denormalizes it and
//!   classifies the outcome as found, not found, invalidated or errored.
//! - [`StoreHandle`] serializes writers so readers only ever observe whole
//!   snapshots.
//! - [`persist`] saves and loads snapshots as JSON.

mod error;
mod handle;
mod meta;
pub mod persist;
mod selector;
mod store;

pub use error::{StoreError, StoreResult};
pub use handle::StoreHandle;
pub use meta::{CacheError, ErrorKind, Meta};
pub use selector::{SelectError, Selection, SelectorConfig, select, select_with};
pub use store::Store;
