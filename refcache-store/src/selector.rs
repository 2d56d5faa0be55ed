//! Reads one fingerprint out of a store snapshot.

use crate::{CacheError, Store};
use refcache_model::{Schema, SchemaRegistry};
use refcache_normalizr::{NormalizeError, denormalize};
use refcache_types::Fingerprint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Outcome of a cache read.
///
/// Serializes as `{"status": "found", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Selection {
    /// Fully resolved view.
    Found(Value),
    /// Nothing cached for the fingerprint.
    NotFound,
    /// Cached data exists but was marked stale.
    Invalidated,
    /// The last fetch failed, or the cached result no longer resolves.
    Error(CacheError),
}

impl Selection {
    /// True only for [`Selection::Found`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Programmer errors surfaced by [`select`]. Never returned for bad data.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// The schema's cardinality disagrees with the stored result.
    #[error(
        "shape mismatch reading {fingerprint}: schema expects {expected}, stored result is {found}"
    )]
    ShapeMismatch {
        fingerprint: Fingerprint,
        expected: &'static str,
        found: &'static str,
    },

    /// The schema names an entity type the registry does not know.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Selector behavior. Deserializes from partial JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Include missing keys and the schema in integrity error messages.
    pub verbose_errors: bool,
    /// Look an entity up by the key in the request params when no result
    /// is indexed for the fingerprint.
    pub pk_fallback: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            verbose_errors: true,
            pk_fallback: true,
        }
    }
}

/// [`select_with`] using the default configuration.
pub fn select(
    store: &Store,
    fingerprint: &Fingerprint,
    schema: &Schema,
    registry: &SchemaRegistry,
    params: Option<&Value>,
) -> Result<Selection, SelectError> {
    select_with(store, fingerprint, schema, registry, params, &SelectorConfig::default())
}

/// Reads `fingerprint` from `store`.
///
/// Precedence: a recorded fetch error, then invalidation, then the stored
/// result (or the primary-key fallback when there is none). A stored result
/// that does not fully resolve is reported as a [`CacheError`] of kind
/// `CacheIntegrity`; a result whose shape contradicts the schema is a
/// [`SelectError::ShapeMismatch`].
pub fn select_with(
    store: &Store,
    fingerprint: &Fingerprint,
    schema: &Schema,
    registry: &SchemaRegistry,
    params: Option<&Value>,
    config: &SelectorConfig,
) -> Result<Selection, SelectError> {
    if let Some(meta) = store.meta_for(fingerprint.as_str()) {
        if let Some(error) = &meta.error {
            debug!("Select {}: error ({})", fingerprint, error.message);
            return Ok(Selection::Error(error.clone()));
        }
        if meta.invalidated {
            debug!("Select {}: invalidated", fingerprint);
            return Ok(Selection::Invalidated);
        }
    }

    let Some(skeleton) = store.result(fingerprint.as_str()) else {
        if config.pk_fallback
            && let Some(value) = select_by_params(store, schema, registry, params)?
        {
            debug!("Select {}: found by primary key", fingerprint);
            return Ok(Selection::Found(value));
        }
        debug!("Select {}: not found", fingerprint);
        return Ok(Selection::NotFound);
    };

    if let Some(expected) = cardinality_mismatch(schema, skeleton) {
        return Err(SelectError::ShapeMismatch {
            fingerprint: fingerprint.clone(),
            expected,
            found: json_kind(skeleton),
        });
    }

    let view = denormalize(skeleton, schema, registry, store.entities())?;
    if !view.complete {
        debug!(
            "Select {}: {} unresolved references",
            fingerprint,
            view.missing.len()
        );
        return Ok(Selection::Error(CacheError::integrity(
            fingerprint,
            schema,
            &view.missing,
            config.verbose_errors,
        )));
    }
    Ok(Selection::Found(view.value))
}

/// Entity lookup keyed by the request params themselves.
///
/// Only applies to singular entity schemas, and only yields a value when the
/// entity and everything it references are present.
fn select_by_params(
    store: &Store,
    schema: &Schema,
    registry: &SchemaRegistry,
    params: Option<&Value>,
) -> Result<Option<Value>, SelectError> {
    let (Schema::Entity(key), Some(params)) = (schema, params) else {
        return Ok(None);
    };
    let entity = registry.entity(key).map_err(NormalizeError::from)?;
    let Some(pk) = entity.primary_key(params) else {
        return Ok(None);
    };
    if store.entities().record(key, &pk).is_none() {
        return Ok(None);
    }
    let view = denormalize(&Value::String(pk), schema, registry, store.entities())?;
    Ok(view.complete.then_some(view.value))
}

/// Returns what the schema expected when the stored skeleton has the wrong
/// cardinality. A `null` skeleton is never a mismatch.
fn cardinality_mismatch(schema: &Schema, skeleton: &Value) -> Option<&'static str> {
    if skeleton.is_null() {
        return None;
    }
    let fits = match schema {
        Schema::Plain => true,
        Schema::Entity(_) => skeleton.is_string() || skeleton.is_number(),
        Schema::Array(_) => skeleton.is_array(),
        Schema::Object(_) | Schema::Values(_) | Schema::Union(_) => skeleton.is_object(),
    };
    (!fits).then(|| match schema {
        Schema::Entity(_) => "a single entity reference",
        Schema::Array(_) => "a list",
        _ => "an object",
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) | Value::String(_) => "a scalar reference",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
