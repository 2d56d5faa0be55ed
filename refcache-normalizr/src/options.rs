use serde::{Deserialize, Serialize};

/// Knobs for how strictly [`normalize_with`](crate::normalize_with) treats
/// malformed input.
///
/// Deserializes from partial JSON; omitted fields take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub missing_pk: MissingPkPolicy,
    pub shape: ShapePolicy,
}

impl NormalizeOptions {
    /// Skips keyless entities and copies mis-shaped values through, logging
    /// a warning for each.
    pub fn lenient() -> Self {
        Self {
            missing_pk: MissingPkPolicy::Skip,
            shape: ShapePolicy::Warn,
        }
    }
}

/// What to do with an entity instance whose primary key cannot be derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPkPolicy {
    /// Fail the whole call with `MissingPrimaryKey`.
    #[default]
    Fail,
    /// Drop the instance, leaving `null` in the skeleton.
    Skip,
}

/// What to do when an entity or object node receives a non-object value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapePolicy {
    /// Fail the whole call with `ShapeMismatch`.
    #[default]
    Fail,
    /// Copy the value through unchanged. A string or number at an entity
    /// node then acts as an already-normalized reference.
    Warn,
}
