//! Normalization engine for refcache.
//!
//! [`normalize`] walks a nested JSON value against a [`Schema`] and splits it
//! into a flat [`EntityTable`] plus a result skeleton in which every entity is
//! replaced by its primary key. [`denormalize`] walks a skeleton and a table
//! back into the nested shape.
//!
//! Both walks are keyed on [`EntityKey`]:
//! - normalization keeps a guard set of entities currently being descended
//!   into and emits a bare reference on re-entry, so cyclic input terminates
//! - denormalization memoizes finished entities for the duration of one call
//!   and emits the stored record shallowly when it meets an entity that is
//!   still being rebuilt
//!
//! Neither walk has side effects on failure: normalization builds its delta
//! privately and only hands it out on success, and denormalization never
//! writes to the table.
//!
//! [`Schema`]: refcache_model::Schema
//! [`EntityTable`]: refcache_model::EntityTable
//! [`EntityKey`]: refcache_types::EntityKey

mod denormalize;
mod error;
mod normalize;
mod options;
mod path;

pub use denormalize::{Denormalized, denormalize};
pub use error::{NormalizeError, NormalizeResult};
pub use normalize::{Normalized, merge_tables, normalize, normalize_into, normalize_with};
pub use options::{MissingPkPolicy, NormalizeOptions, ShapePolicy};

/// Field names of a normalized union member: `{"id": .., "schema": tag}`.
pub const UNION_ID: &str = "id";
pub const UNION_TAG: &str = "schema";
