//! Schema model for refcache.
//!
//! Defines the types that describe how nested API responses map onto a flat
//! entity table:
//! - [`Schema`]: closed set of schema node variants (entity, array, object,
//!   union, values, plain)
//! - [`EntityDef`]: declares an entity type's primary key, merge strategy and
//!   nested field schemas
//! - [`MergeStrategy`]: how two records for the same identity are combined
//! - [`EntityHandler`]: optional trait for custom key derivation and merge
//! - [`SchemaRegistry`]: the arena entity nodes refer into by type key
//! - [`EntityTable`]: the flat `type -> pk -> slot` table, with the
//!   [`EntitySlot::Deleted`] marker
//!
//! Entity nodes refer to their definition by key rather than by pointer, so a
//! schema graph may be cyclic without any reference cycles in memory.

mod entity;
mod error;
mod handler;
mod registry;
mod schema;
mod table;

pub use entity::{EntityDef, MergeStrategy, PrimaryKey};
pub use error::{ModelError, ModelResult};
pub use handler::{EntityHandler, merge_per_field};
pub use registry::{EntityRef, SchemaRegistry};
pub use schema::{Schema, UnionSchema};
pub use table::{DELETED_MARKER, EntitySlot, EntityTable, Record};
