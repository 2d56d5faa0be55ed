use crate::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declares one entity type: how to key it, how to merge it, and which of
/// its fields hold nested schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Type key; the first level of the entity table.
    pub key: String,
    #[serde(default)]
    pub primary_key: PrimaryKey,
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    /// Nested field schemas. Fields not listed are stored verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema: BTreeMap<String, Schema>,
}

impl EntityDef {
    /// An entity keyed by its `id` field with per-field merge and no nested
    /// schemas.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.into(),
            primary_key: PrimaryKey::default(),
            merge_strategy: MergeStrategy::default(),
            schema: BTreeMap::new(),
        }
    }

    /// Sets the primary key strategy.
    pub fn primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Sets the merge strategy.
    pub fn merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    /// Declares a nested schema for one field.
    pub fn field(mut self, name: &str, schema: Schema) -> Self {
        self.schema.insert(name.into(), schema);
        self
    }
}

/// How the primary key is derived from an entity's raw input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKey {
    /// Value of a single top-level field.
    Field(String),
    /// Values of several fields joined with `,`. All must be present.
    ///
    /// `\` and `,` inside a value are escaped with `\`, so distinct field
    /// tuples never produce the same key.
    Fields(Vec<String>),
    /// Provided by the type's [`EntityHandler`](crate::EntityHandler).
    Custom,
}

impl Default for PrimaryKey {
    fn default() -> Self {
        Self::Field("id".into())
    }
}

impl PrimaryKey {
    /// Derives a key from field values. Always `None` for [`PrimaryKey::Custom`].
    pub fn derive(&self, input: &Value) -> Option<String> {
        match self {
            Self::Field(name) => key_part(input.get(name)?),
            Self::Fields(names) => {
                let parts = names
                    .iter()
                    .map(|name| input.get(name).and_then(key_part).map(|p| escape_part(&p)))
                    .collect::<Option<Vec<_>>>()?;
                Some(parts.join(","))
            }
            Self::Custom => None,
        }
    }
}

/// Stringifies a scalar for use as a primary key.
///
/// Null, empty strings and compound values never form a key.
fn key_part(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn escape_part(part: &str) -> String {
    part.replace('\\', "\\\\").replace(',', "\\,")
}

/// How two records for the same `(type, pk)` are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Shallow merge; incoming fields win, existing-only fields survive.
    #[default]
    PerField,
    /// Incoming record replaces the stored one whole.
    Replace,
    /// The type's [`EntityHandler::merge`](crate::EntityHandler::merge) decides.
    Custom,
}
