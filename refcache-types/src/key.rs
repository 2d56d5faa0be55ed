//! Entity identity.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one entity instance: its type key plus its primary key.
///
/// Used as the guard-stack entry during normalization and as the memo key
/// during denormalization, so identity never depends on pointer equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_type: String,
    pub pk: String,
}

impl EntityKey {
    /// Creates a key from a type key and a primary key.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, pk: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            pk: pk.into(),
        }
    }

    /// Parses a `type:pk` string. The primary key may itself contain `:`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s.split_once(':') {
            Some((ty, pk)) if !ty.is_empty() && !pk.is_empty() => Ok(Self::new(ty, pk)),
            _ => Err(Error::InvalidEntityKey(format!(
                "expected `type:pk`, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.pk)
    }
}

impl FromStr for EntityKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
