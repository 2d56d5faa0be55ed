use refcache_model::Schema;
use refcache_types::{EntityKey, Fingerprint, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Per-fingerprint bookkeeping written by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Set when the last fetch failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CacheError>,
    /// Cached data is stale but kept.
    #[serde(default)]
    pub invalidated: bool,
    /// When the last response (or error) arrived.
    pub date: Timestamp,
    /// When the cached result stops being fresh.
    pub expires_at: Timestamp,
}

impl Meta {
    /// Meta for a successful response.
    pub fn fresh(date: Timestamp, expires_at: Timestamp) -> Self {
        Self {
            error: None,
            invalidated: false,
            date,
            expires_at,
        }
    }
}

/// Where an error surfaced by the selector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Recorded by the request layer after a failed fetch.
    Fetch,
    /// The stored result references entities the table does not hold.
    CacheIntegrity,
}

/// An error attached to a fingerprint, or produced while reading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct CacheError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP-style status, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl CacheError {
    /// Status reported for integrity failures: the response was malformed.
    pub const INTEGRITY_STATUS: u16 = 400;

    /// A failed fetch as recorded by the request layer.
    pub fn fetch(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind: ErrorKind::Fetch,
            message: message.into(),
            status,
        }
    }

    /// A stored result that no longer denormalizes completely.
    ///
    /// With `verbose`, the message lists the unresolved entities and the
    /// schema used to read the result.
    pub fn integrity(
        fingerprint: &Fingerprint,
        schema: &Schema,
        missing: &[EntityKey],
        verbose: bool,
    ) -> Self {
        let message = if verbose {
            let mut message = format!(
                "Entity from \"{fingerprint}\" not found in cache.\n\n\
                 The response likely omitted a required entity, or the entity \
                 was removed after the response was stored."
            );
            if !missing.is_empty() {
                let keys: Vec<String> = missing.iter().map(ToString::to_string).collect();
                let _ = write!(message, "\n\nMissing: {}", keys.join(", "));
            }
            let schema_json = serde_json::to_string_pretty(schema)
                .unwrap_or_else(|_| schema.kind().to_string());
            let _ = write!(message, "\n\nSchema: {schema_json}");
            message
        } else {
            format!("Missing required entity in \"{fingerprint}\"; response likely malformed.")
        };
        Self {
            kind: ErrorKind::CacheIntegrity,
            message,
            status: Some(Self::INTEGRITY_STATUS),
        }
    }

    pub fn is_integrity(&self) -> bool {
        self.kind == ErrorKind::CacheIntegrity
    }
}
