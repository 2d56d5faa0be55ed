use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Describes how to interpret one node of a nested input value.
///
/// The JSON form is externally tagged in snake_case so schemas can live in
/// configuration files:
/// `{"array": {"entity": "article"}}`, `{"object": {"author": {"entity": "user"}}}`,
/// `{"union": {"attribute": "type", "variants": {...}}}`, `"plain"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    /// Value is copied as-is.
    #[default]
    Plain,
    /// An entity, by type key into the [`SchemaRegistry`](crate::SchemaRegistry).
    Entity(String),
    /// Ordered sequence; the child schema applies to every element.
    Array(Box<Schema>),
    /// Named fields; fields without a schema pass through.
    Object(BTreeMap<String, Schema>),
    /// Arbitrary-keyed mapping; the child schema applies to every value.
    Values(Box<Schema>),
    /// One of several schemas, chosen by a tag field on the input.
    Union(UnionSchema),
}

impl Schema {
    /// Shorthand for an entity node.
    pub fn entity(key: &str) -> Self {
        Self::Entity(key.into())
    }

    /// Shorthand for an array node.
    pub fn array(item: Schema) -> Self {
        Self::Array(Box::new(item))
    }

    /// Shorthand for an object node.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// Shorthand for a values-map node.
    pub fn values(item: Schema) -> Self {
        Self::Values(Box::new(item))
    }

    /// Shorthand for a union node discriminated on `attribute`.
    pub fn union<I, K>(attribute: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::Union(UnionSchema {
            attribute: attribute.into(),
            variants: variants.into_iter().map(|(k, s)| (k.into(), s)).collect(),
        })
    }

    /// True for [`Schema::Plain`].
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain)
    }

    /// Short variant name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Entity(_) => "entity",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Values(_) => "values",
            Self::Union(_) => "union",
        }
    }

    /// Entity type keys named directly by this schema tree.
    ///
    /// Does not follow entity definitions into their nested schemas; use
    /// [`SchemaRegistry::validate`](crate::SchemaRegistry::validate) for the
    /// transitive closure.
    pub fn entity_keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        self.collect_entity_keys(&mut keys);
        keys
    }

    fn collect_entity_keys<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Plain => {}
            Self::Entity(key) => {
                out.insert(key.as_str());
            }
            Self::Array(item) | Self::Values(item) => item.collect_entity_keys(out),
            Self::Object(fields) => {
                for schema in fields.values() {
                    schema.collect_entity_keys(out);
                }
            }
            Self::Union(union) => {
                for schema in union.variants.values() {
                    schema.collect_entity_keys(out);
                }
            }
        }
    }
}

/// Tag-discriminated choice between schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionSchema {
    /// Field on the input whose string value selects the variant.
    pub attribute: String,
    pub variants: BTreeMap<String, Schema>,
}

impl UnionSchema {
    /// Reads the tag from `input` and returns it with the matching variant.
    ///
    /// Returns `None` when the input is not an object, lacks a string tag, or
    /// names a tag with no variant.
    pub fn resolve<'a>(&'a self, input: &Value) -> Option<(&'a str, &'a Schema)> {
        let tag = input.get(&self.attribute)?.as_str()?;
        self.variant(tag)
    }

    /// Looks up a variant by tag.
    pub fn variant<'a>(&'a self, tag: &str) -> Option<(&'a str, &'a Schema)> {
        self.variants
            .get_key_value(tag)
            .map(|(k, s)| (k.as_str(), s))
    }
}
