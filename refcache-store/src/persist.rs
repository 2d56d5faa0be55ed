//! JSON persistence for store snapshots.
//!
//! Snapshots are written to a sibling temp file and renamed into place, so a
//! crash mid-write never leaves a truncated store behind. Deleted entity
//! slots are written as the reserved marker string and read back as such.

use crate::{Store, StoreResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes `store` as pretty-printed JSON.
pub fn save(store: &Store, path: &Path) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(store)?;
    let tmp = temp_path(path);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    debug!("Saved store v{} to {}", store.version(), path.display());
    Ok(())
}

/// Reads a store written by [`save`] (or any JSON of the same shape).
pub fn load(path: &Path) -> StoreResult<Store> {
    let bytes = fs::read(path)?;
    let store: Store = serde_json::from_slice(&bytes)?;
    debug!("Loaded store v{} from {}", store.version(), path.display());
    Ok(store)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".tmp");
    path.with_file_name(name)
}
