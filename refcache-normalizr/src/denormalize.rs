//! (result skeleton, entity table) -> nested value.

use crate::{NormalizeResult, UNION_ID, UNION_TAG};
use refcache_model::{EntitySlot, EntityTable, Record, Schema, SchemaRegistry, UnionSchema};
use refcache_types::EntityKey;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A reconstructed view and whether every reference resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Denormalized {
    pub value: Value,
    /// False if any referenced entity was absent or deleted, or a union
    /// member could not be resolved.
    pub complete: bool,
    /// Entity references that did not resolve, in visit order, deduplicated.
    pub missing: Vec<EntityKey>,
}

/// Rebuilds the nested value for `skeleton` from `entities`.
///
/// Missing entities become `null` and clear [`Denormalized::complete`]
/// instead of failing, so a partially cached graph still yields a usable
/// view. Only an entity type unknown to `registry` is an error.
pub fn denormalize(
    skeleton: &Value,
    schema: &Schema,
    registry: &SchemaRegistry,
    entities: &EntityTable,
) -> NormalizeResult<Denormalized> {
    let mut walker = Denormalizer {
        registry,
        entities,
        memo: HashMap::new(),
        building: HashSet::new(),
        missing: Vec::new(),
        complete: true,
    };
    let value = walker.visit(skeleton, schema)?;
    if !walker.complete {
        debug!(
            "Denormalized {} schema with {} unresolved references",
            schema.kind(),
            walker.missing.len()
        );
    }
    Ok(Denormalized {
        value,
        complete: walker.complete,
        missing: walker.missing,
    })
}

struct Denormalizer<'a> {
    registry: &'a SchemaRegistry,
    entities: &'a EntityTable,
    /// Finished entities, reused for every later reference in this call.
    memo: HashMap<EntityKey, Value>,
    /// Entities whose fields are being rebuilt right now.
    building: HashSet<EntityKey>,
    missing: Vec<EntityKey>,
    complete: bool,
}

impl Denormalizer<'_> {
    fn visit(&mut self, value: &Value, schema: &Schema) -> NormalizeResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match schema {
            Schema::Plain => Ok(value.clone()),
            Schema::Entity(key) => self.visit_entity(value, key),
            Schema::Array(item) => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|v| self.visit(v, item))
                    .collect::<NormalizeResult<Vec<_>>>()
                    .map(Value::Array),
                other => Ok(other.clone()),
            },
            Schema::Object(fields) => match value {
                Value::Object(map) => {
                    let mut out = map.clone();
                    self.rebuild_fields(&mut out, fields.iter())?;
                    Ok(Value::Object(out))
                }
                other => Ok(other.clone()),
            },
            Schema::Values(item) => match value {
                Value::Object(map) => {
                    let mut out = Record::new();
                    for (k, v) in map {
                        out.insert(k.clone(), self.visit(v, item)?);
                    }
                    Ok(Value::Object(out))
                }
                other => Ok(other.clone()),
            },
            Schema::Union(union) => self.visit_union(value, union),
        }
    }

    fn rebuild_fields<'s>(
        &mut self,
        record: &mut Record,
        fields: impl Iterator<Item = (&'s String, &'s Schema)>,
    ) -> NormalizeResult<()> {
        for (name, schema) in fields {
            if let Some(value) = record.get(name) {
                let rebuilt = self.visit(value, schema)?;
                record.insert(name.clone(), rebuilt);
            }
        }
        Ok(())
    }

    fn visit_union(&mut self, value: &Value, union: &UnionSchema) -> NormalizeResult<Value> {
        let resolved = value
            .get(UNION_TAG)
            .and_then(Value::as_str)
            .and_then(|tag| union.variant(tag))
            .zip(value.get(UNION_ID));
        match resolved {
            Some(((_, schema), id)) => self.visit(id, schema),
            None => {
                self.complete = false;
                Ok(Value::Null)
            }
        }
    }

    fn visit_entity(&mut self, value: &Value, key: &str) -> NormalizeResult<Value> {
        let registry = self.registry;
        let entity = registry.entity(key)?;

        let pk = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            // Entity stored inline rather than by reference.
            Value::Object(inline) => {
                let mut out = inline.clone();
                self.rebuild_fields(&mut out, entity.fields().iter())?;
                return Ok(Value::Object(out));
            }
            _ => {
                self.complete = false;
                return Ok(Value::Null);
            }
        };

        let identity = EntityKey::new(key, pk);
        if let Some(done) = self.memo.get(&identity) {
            return Ok(done.clone());
        }

        let entities = self.entities;
        let record = match entities.get(key, &identity.pk) {
            Some(EntitySlot::Record(record)) => record,
            Some(EntitySlot::Deleted) | None => {
                self.complete = false;
                if !self.missing.contains(&identity) {
                    self.missing.push(identity);
                }
                return Ok(Value::Null);
            }
        };

        if self.building.contains(&identity) {
            // Cycle: hand back the stored record with references left as keys.
            return Ok(Value::Object(record.clone()));
        }

        self.building.insert(identity.clone());
        let mut out = record.clone();
        let rebuilt = self.rebuild_fields(&mut out, entity.fields().iter());
        self.building.remove(&identity);
        rebuilt?;

        let value = Value::Object(out);
        self.memo.insert(identity, value.clone());
        Ok(value)
    }
}
