use crate::Record;

/// Optional trait for entity types that need custom key derivation or merge
/// logic beyond [`PrimaryKey`](crate::PrimaryKey) and
/// [`MergeStrategy`](crate::MergeStrategy).
///
/// Most entity types do NOT need this; a field-based key and per-field merge
/// cover typical API payloads. Only implement it for:
/// - Keys computed from nested or transformed fields
/// - Merges that compare versions or timestamps carried in the payload
pub trait EntityHandler: Send + Sync {
    /// Derives the primary key for [`PrimaryKey::Custom`](crate::PrimaryKey::Custom).
    /// Return `None` when the input carries no usable key.
    fn primary_key(&self, input: &Record) -> Option<String> {
        let _ = input;
        None
    }

    /// Custom merge for [`MergeStrategy::Custom`](crate::MergeStrategy::Custom).
    /// Default implementation is a per-field merge with incoming values winning.
    fn merge(&self, existing: &Record, incoming: &Record) -> Record {
        merge_per_field(existing, incoming)
    }
}

/// Shallow merge: every incoming field overwrites, existing-only fields stay.
pub fn merge_per_field(existing: &Record, incoming: &Record) -> Record {
    let mut merged = existing.clone();
    for (key, value) in incoming {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
