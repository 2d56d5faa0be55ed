use crate::{CacheError, Meta, StoreResult};
use refcache_model::{EntityTable, Schema, SchemaRegistry};
use refcache_normalizr::{NormalizeOptions, Normalized, normalize_with};
use refcache_types::{Fingerprint, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// An immutable snapshot of the cache.
///
/// Writes never mutate a snapshot in place; each returns a successor with
/// `version + 1`. Tables are held behind `Arc`, so a write only copies the
/// table it changes and holders of older snapshots are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    entities: Arc<EntityTable>,
    #[serde(default)]
    results: Arc<BTreeMap<Fingerprint, Value>>,
    #[serde(default)]
    meta: Arc<BTreeMap<Fingerprint, Meta>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from existing tables at version 0.
    pub fn from_parts(
        entities: EntityTable,
        results: BTreeMap<Fingerprint, Value>,
        meta: BTreeMap<Fingerprint, Meta>,
    ) -> Self {
        Self {
            version: 0,
            entities: Arc::new(entities),
            results: Arc::new(results),
            meta: Arc::new(meta),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn results(&self) -> &BTreeMap<Fingerprint, Value> {
        &self.results
    }

    pub fn meta(&self) -> &BTreeMap<Fingerprint, Meta> {
        &self.meta
    }

    /// Stored result skeleton for a fingerprint.
    pub fn result(&self, fingerprint: &str) -> Option<&Value> {
        self.results.get(fingerprint)
    }

    pub fn meta_for(&self, fingerprint: &str) -> Option<&Meta> {
        self.meta.get(fingerprint)
    }

    /// True if the fingerprint was never fetched or its result has expired.
    pub fn is_stale(&self, fingerprint: &str, now: Timestamp) -> bool {
        self.meta
            .get(fingerprint)
            .is_none_or(|meta| meta.invalidated || meta.expires_at <= now)
    }

    /// Commits a normalization pass: merges its entities, stores its result
    /// and resets the fingerprint's meta to fresh.
    #[must_use]
    pub fn receive(
        &self,
        fingerprint: &Fingerprint,
        normalized: Normalized,
        registry: &SchemaRegistry,
        date: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        let mut next = self.successor();
        debug!(
            "Receiving {} with {} entities (v{})",
            fingerprint,
            normalized.entities.len(),
            next.version
        );
        Arc::make_mut(&mut next.entities).merge(normalized.entities, registry);
        Arc::make_mut(&mut next.results).insert(fingerprint.clone(), normalized.result);
        Arc::make_mut(&mut next.meta).insert(fingerprint.clone(), Meta::fresh(date, expires_at));
        next
    }

    /// Normalizes a raw response and commits it.
    ///
    /// On failure the error is returned and no snapshot is produced.
    #[allow(clippy::too_many_arguments)]
    pub fn ingest(
        &self,
        fingerprint: &Fingerprint,
        response: &Value,
        schema: &Schema,
        registry: &SchemaRegistry,
        options: &NormalizeOptions,
        date: Timestamp,
        expires_at: Timestamp,
    ) -> StoreResult<Self> {
        let normalized = normalize_with(response, schema, registry, options)?;
        Ok(self.receive(fingerprint, normalized, registry, date, expires_at))
    }

    /// Records a failed fetch. Any previously stored result is kept.
    #[must_use]
    pub fn receive_error(
        &self,
        fingerprint: &Fingerprint,
        error: CacheError,
        date: Timestamp,
    ) -> Self {
        let mut next = self.successor();
        debug!("Recording error for {}: {}", fingerprint, error);
        let meta = Arc::make_mut(&mut next.meta)
            .entry(fingerprint.clone())
            .or_default();
        meta.error = Some(error);
        meta.date = date;
        meta.expires_at = date;
        next
    }

    /// Marks a fingerprint's data stale without removing it.
    #[must_use]
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> Self {
        let mut next = self.successor();
        debug!("Invalidating {}", fingerprint);
        Arc::make_mut(&mut next.meta)
            .entry(fingerprint.clone())
            .or_default()
            .invalidated = true;
        next
    }

    /// Replaces an entity with the deletion marker.
    #[must_use]
    pub fn delete_entity(&self, entity_type: &str, pk: &str) -> Self {
        let mut next = self.successor();
        debug!("Deleting {}:{}", entity_type, pk);
        Arc::make_mut(&mut next.entities).mark_deleted(entity_type, pk);
        next
    }

    fn successor(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }
}
