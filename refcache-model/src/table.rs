//! The flat entity table and its deletion marker.

use crate::SchemaRegistry;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;

/// One normalized entity: field name to value, nested entities as keys.
pub type Record = serde_json::Map<String, Value>;

/// JSON form of [`EntitySlot::Deleted`]. Records are always objects, so a
/// bare string in a slot position is unambiguous.
pub const DELETED_MARKER: &str = "$deleted";

/// A table slot: a live record or an explicit deletion.
///
/// `Deleted` is distinct from absence: it records that the identity was
/// removed, and it survives merges of older data until a new record for the
/// same identity arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySlot {
    Record(Record),
    Deleted,
}

impl EntitySlot {
    /// Returns the record, or `None` for a deleted slot.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Deleted => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl From<Record> for EntitySlot {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl Serialize for EntitySlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Record(record) => record.serialize(serializer),
            Self::Deleted => serializer.serialize_str(DELETED_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for EntitySlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(record) => Ok(Self::Record(record)),
            Value::String(s) if s == DELETED_MARKER => Ok(Self::Deleted),
            other => Err(de::Error::custom(format!(
                "expected an entity record or {DELETED_MARKER:?}, got {other}"
            ))),
        }
    }
}

/// `type key -> primary key -> slot`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTable(BTreeMap<String, BTreeMap<String, EntitySlot>>);

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw slot lookup; deleted slots are returned as such.
    pub fn get(&self, entity_type: &str, pk: &str) -> Option<&EntitySlot> {
        self.0.get(entity_type)?.get(pk)
    }

    /// Live record lookup; deleted and absent slots both yield `None`.
    pub fn record(&self, entity_type: &str, pk: &str) -> Option<&Record> {
        self.get(entity_type, pk)?.as_record()
    }

    /// Stores a slot without merging, returning the previous slot.
    pub fn insert(
        &mut self,
        entity_type: &str,
        pk: &str,
        slot: EntitySlot,
    ) -> Option<EntitySlot> {
        self.0
            .entry(entity_type.to_string())
            .or_default()
            .insert(pk.to_string(), slot)
    }

    /// Replaces whatever is stored for the identity with the deletion marker.
    pub fn mark_deleted(&mut self, entity_type: &str, pk: &str) {
        self.insert(entity_type, pk, EntitySlot::Deleted);
    }

    /// Merges one slot into the table using the type's merge strategy.
    ///
    /// - nothing stored: the slot is inserted
    /// - incoming `Deleted`: replaces what is stored
    /// - stored `Deleted`, incoming record: the record is stored
    /// - two records: combined per the registered strategy (per-field when
    ///   the type is unknown to the registry)
    pub fn merge_slot(
        &mut self,
        entity_type: &str,
        pk: &str,
        incoming: EntitySlot,
        registry: &SchemaRegistry,
    ) {
        let slots = self.0.entry(entity_type.to_string()).or_default();
        match slots.entry(pk.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(incoming);
            }
            Entry::Occupied(mut entry) => {
                let merged = match (entry.get(), incoming) {
                    (_, EntitySlot::Deleted) => EntitySlot::Deleted,
                    (EntitySlot::Deleted, record) => record,
                    (EntitySlot::Record(existing), EntitySlot::Record(incoming)) => {
                        debug!("Merging {}:{}", entity_type, pk);
                        EntitySlot::Record(registry.merge(entity_type, existing, &incoming))
                    }
                };
                entry.insert(merged);
            }
        }
    }

    /// Folds every slot of `other` into this table.
    pub fn merge(&mut self, other: EntityTable, registry: &SchemaRegistry) {
        for (entity_type, slots) in other.0 {
            for (pk, slot) in slots {
                self.merge_slot(&entity_type, &pk, slot, registry);
            }
        }
    }

    /// Number of slots, deleted ones included.
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
