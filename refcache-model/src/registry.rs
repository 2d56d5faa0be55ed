use crate::{
    EntityDef, EntityHandler, MergeStrategy, ModelError, ModelResult, PrimaryKey, Record, Schema,
    merge_per_field,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Entity definitions by type key, plus their optional handlers.
///
/// This is the arena that [`Schema::Entity`] nodes point into. Because nodes
/// carry a key instead of the definition itself, an entity's nested schema
/// may name its own type or any ancestor.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, EntityDef>,
    handlers: BTreeMap<String, Arc<dyn EntityHandler>>,
}

/// On-disk form: handlers are code and never serialized.
#[derive(Serialize, Deserialize)]
struct RegistryFile {
    entities: Vec<EntityDef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from definitions, failing on duplicate keys.
    pub fn from_defs(defs: impl IntoIterator<Item = EntityDef>) -> ModelResult<Self> {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Parses `{"entities": [...]}`.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::from_defs(file.entities)
    }

    /// Serializes the definitions (not the handlers).
    pub fn to_json(&self) -> ModelResult<String> {
        let file = RegistryFile {
            entities: self.entities.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Adds an entity definition.
    pub fn register(&mut self, def: EntityDef) -> ModelResult<()> {
        if self.entities.contains_key(&def.key) {
            return Err(ModelError::DuplicateEntity(def.key));
        }
        self.entities.insert(def.key.clone(), def);
        Ok(())
    }

    /// Attaches a handler to an already registered type.
    pub fn register_handler(
        &mut self,
        key: &str,
        handler: Arc<dyn EntityHandler>,
    ) -> ModelResult<()> {
        if !self.entities.contains_key(key) {
            return Err(ModelError::UnknownEntity(key.into()));
        }
        self.handlers.insert(key.into(), handler);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<EntityRef<'_>> {
        let def = self.entities.get(key)?;
        Some(EntityRef {
            def,
            handler: self.handlers.get(key).map(Arc::as_ref),
        })
    }

    /// Like [`get`](Self::get) but fails with [`ModelError::UnknownEntity`].
    pub fn entity(&self, key: &str) -> ModelResult<EntityRef<'_>> {
        self.get(key)
            .ok_or_else(|| ModelError::UnknownEntity(key.into()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Merges two records of `entity_type`. Unknown types merge per-field.
    pub fn merge(&self, entity_type: &str, existing: &Record, incoming: &Record) -> Record {
        match self.get(entity_type) {
            Some(entity) => entity.merge(existing, incoming),
            None => merge_per_field(existing, incoming),
        }
    }

    /// Checks that every entity reachable from `schema` is registered and
    /// that custom keys have a handler.
    ///
    /// Each entity definition is visited once, so cyclic schemas terminate.
    pub fn validate(&self, schema: &Schema) -> ModelResult<()> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&Schema> = vec![schema];
        while let Some(node) = pending.pop() {
            for key in node.entity_keys() {
                if !seen.insert(key.to_string()) {
                    continue;
                }
                let entity = self.entity(key)?;
                if entity.def.primary_key == PrimaryKey::Custom && entity.handler.is_none() {
                    return Err(ModelError::MissingHandler(key.into()));
                }
                pending.extend(entity.def.schema.values());
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("entities", &self.entities)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A registered entity type: its definition and optional handler.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    pub def: &'a EntityDef,
    pub handler: Option<&'a dyn EntityHandler>,
}

impl<'a> EntityRef<'a> {
    pub fn key(&self) -> &'a str {
        &self.def.key
    }

    /// Nested field schemas.
    pub fn fields(&self) -> &'a BTreeMap<String, Schema> {
        &self.def.schema
    }

    /// Derives the primary key, or `None` if the input lacks one.
    pub fn primary_key(&self, input: &Value) -> Option<String> {
        match &self.def.primary_key {
            PrimaryKey::Custom => {
                let record = input.as_object()?;
                self.handler?
                    .primary_key(record)
                    .filter(|pk| !pk.is_empty())
            }
            strategy => strategy.derive(input),
        }
    }

    /// Combines two records per the type's merge strategy.
    pub fn merge(&self, existing: &Record, incoming: &Record) -> Record {
        match self.def.merge_strategy {
            MergeStrategy::PerField => merge_per_field(existing, incoming),
            MergeStrategy::Replace => incoming.clone(),
            MergeStrategy::Custom => match self.handler {
                Some(handler) => handler.merge(existing, incoming),
                None => {
                    warn!(
                        "Custom merge strategy for {} but no handler; falling back to per-field",
                        self.def.key
                    );
                    merge_per_field(existing, incoming)
                }
            },
        }
    }
}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("def", self.def)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
