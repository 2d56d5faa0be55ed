//! Nested input -> (result skeleton, entity table delta).

use crate::path::{Path, kind_of};
use crate::{
    MissingPkPolicy, NormalizeError, NormalizeOptions, NormalizeResult, ShapePolicy, UNION_ID,
    UNION_TAG,
};
use refcache_model::{EntityTable, Record, Schema, SchemaRegistry, UnionSchema};
use refcache_types::EntityKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Output of one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    /// Input shape with entities replaced by primary keys.
    pub result: Value,
    /// Every entity found in the input, merged per type.
    pub entities: EntityTable,
}

/// Normalizes with default options (fail on missing keys and bad shapes).
pub fn normalize(
    input: &Value,
    schema: &Schema,
    registry: &SchemaRegistry,
) -> NormalizeResult<Normalized> {
    normalize_with(input, schema, registry, &NormalizeOptions::default())
}

/// Normalizes `input` against `schema`, returning a fresh entity delta.
pub fn normalize_with(
    input: &Value,
    schema: &Schema,
    registry: &SchemaRegistry,
    options: &NormalizeOptions,
) -> NormalizeResult<Normalized> {
    let mut walker = Normalizer::new(registry, options);
    let result = walker.visit(input, schema)?;
    debug!(
        "Normalized {} schema into {} entities",
        schema.kind(),
        walker.entities.len()
    );
    Ok(Normalized {
        result,
        entities: walker.entities,
    })
}

/// Normalizes and merges the delta into `table`, returning the skeleton.
///
/// `table` is untouched if normalization fails.
pub fn normalize_into(
    input: &Value,
    schema: &Schema,
    registry: &SchemaRegistry,
    options: &NormalizeOptions,
    table: &mut EntityTable,
) -> NormalizeResult<Value> {
    let Normalized { result, entities } = normalize_with(input, schema, registry, options)?;
    table.merge(entities, registry);
    Ok(result)
}

/// Folds `delta` into `base` using each type's merge strategy.
pub fn merge_tables(
    base: &EntityTable,
    delta: EntityTable,
    registry: &SchemaRegistry,
) -> EntityTable {
    let mut merged = base.clone();
    merged.merge(delta, registry);
    merged
}

struct Normalizer<'a> {
    registry: &'a SchemaRegistry,
    options: &'a NormalizeOptions,
    entities: EntityTable,
    /// Entities whose fields are being normalized right now.
    active: HashSet<EntityKey>,
    path: Path,
}

impl<'a> Normalizer<'a> {
    fn new(registry: &'a SchemaRegistry, options: &'a NormalizeOptions) -> Self {
        Self {
            registry,
            options,
            entities: EntityTable::new(),
            active: HashSet::new(),
            path: Path::default(),
        }
    }

    fn visit(&mut self, input: &Value, schema: &Schema) -> NormalizeResult<Value> {
        if input.is_null() {
            return Ok(Value::Null);
        }
        match schema {
            Schema::Plain => Ok(input.clone()),
            Schema::Entity(key) => self.visit_entity(input, key),
            Schema::Array(item) => self.visit_array(input, item),
            Schema::Object(fields) => self.visit_object(input, fields.iter()),
            Schema::Values(item) => match input {
                Value::Object(map) => {
                    let fields: Vec<_> = map.keys().map(|k| (k, item.as_ref())).collect();
                    self.visit_object(input, fields.into_iter())
                }
                other => self.mismatch("object", other),
            },
            Schema::Union(union) => self.visit_union(input, union),
        }
    }

    fn visit_array(&mut self, input: &Value, item: &Schema) -> NormalizeResult<Value> {
        let Value::Array(items) = input else {
            return self.mismatch("array", input);
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, value) in items.iter().enumerate() {
            self.path.push(i);
            let normalized = self.visit(value, item);
            self.path.pop();
            out.push(normalized?);
        }
        Ok(Value::Array(out))
    }

    /// Copies `input` and normalizes the named fields in place. Fields absent
    /// from the input stay absent.
    fn visit_object<'s>(
        &mut self,
        input: &Value,
        fields: impl Iterator<Item = (&'s String, &'s Schema)>,
    ) -> NormalizeResult<Value> {
        let Value::Object(map) = input else {
            return self.mismatch("object", input);
        };
        let mut out = map.clone();
        self.normalize_fields(&mut out, fields)?;
        Ok(Value::Object(out))
    }

    fn normalize_fields<'s>(
        &mut self,
        record: &mut Map<String, Value>,
        fields: impl Iterator<Item = (&'s String, &'s Schema)>,
    ) -> NormalizeResult<()> {
        for (name, schema) in fields {
            let Some(value) = record.get(name) else {
                continue;
            };
            self.path.push(name);
            let normalized = self.visit(value, schema);
            self.path.pop();
            record.insert(name.clone(), normalized?);
        }
        Ok(())
    }

    fn visit_union(&mut self, input: &Value, union: &UnionSchema) -> NormalizeResult<Value> {
        let Some((tag, schema)) = union.resolve(input) else {
            let found = input
                .get(&union.attribute)
                .map_or_else(|| "no tag".to_string(), |t| format!("tag {t}"));
            return Err(NormalizeError::SchemaMismatch {
                path: self.path.render(),
                reason: format!(
                    "union on `{}` has no variant for {found}",
                    union.attribute
                ),
            });
        };
        let id = self.visit(input, schema)?;
        let mut member = Map::new();
        member.insert(UNION_ID.into(), id);
        member.insert(UNION_TAG.into(), Value::String(tag.into()));
        Ok(Value::Object(member))
    }

    fn visit_entity(&mut self, input: &Value, key: &str) -> NormalizeResult<Value> {
        let registry = self.registry;
        let entity = registry.entity(key)?;
        let Value::Object(raw) = input else {
            return self.mismatch("entity object", input);
        };

        let Some(pk) = entity.primary_key(input) else {
            let path = self.path.render();
            return match self.options.missing_pk {
                MissingPkPolicy::Fail => Err(NormalizeError::MissingPrimaryKey {
                    entity: key.into(),
                    path,
                }),
                MissingPkPolicy::Skip => {
                    warn!("Skipping {} at {}: no primary key", key, path);
                    Ok(Value::Null)
                }
            };
        };

        let identity = EntityKey::new(key, pk.clone());
        if self.active.contains(&identity) {
            // Re-entered an entity mid-descent; its outer occurrence owns the record.
            return Ok(Value::String(pk));
        }

        self.active.insert(identity.clone());
        let mut record: Record = raw.clone();
        let nested = self.normalize_fields(&mut record, entity.fields().iter());
        self.active.remove(&identity);
        nested?;

        self.entities.merge_slot(key, &pk, record.into(), registry);
        Ok(Value::String(pk))
    }

    /// Fails or passes the value through, per [`ShapePolicy`].
    fn mismatch(&self, expected: &'static str, found: &Value) -> NormalizeResult<Value> {
        let path = self.path.render();
        match self.options.shape {
            ShapePolicy::Fail => Err(NormalizeError::ShapeMismatch {
                path,
                expected,
                found: kind_of(found),
            }),
            ShapePolicy::Warn => {
                warn!(
                    "Expected {} at {}, found {}; copying through",
                    expected,
                    path,
                    kind_of(found)
                );
                Ok(found.clone())
            }
        }
    }
}
