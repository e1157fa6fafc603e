//! JSON snapshot of a [`MemoryStore`] on disk.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;

use super::{Key, MemoryStore, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    kind: String,
    key: Key,
    value: Value,
}

/// Load a store from `path`. A missing file yields an empty store.
pub async fn load(path: &Path) -> Result<MemoryStore, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(MemoryStore::new());
        }
        Err(err) => return Err(err.into()),
    };
    let records: Vec<SnapshotRecord> = serde_json::from_slice(&bytes).map_err(StoreError::Snapshot)?;
    tracing::info!(path = %path.display(), records = records.len(), "snapshot loaded");
    Ok(MemoryStore::from_records(
        records.into_iter().map(|r| (r.kind, r.key, r.value)),
    ))
}

/// Write every record of `store` to `path`.
///
/// The snapshot goes to a sibling temp file first and is renamed into place,
/// so a crash mid-write leaves the previous snapshot intact.
pub async fn save(store: &MemoryStore, path: &Path) -> Result<(), StoreError> {
    let records: Vec<SnapshotRecord> = store
        .records()
        .into_iter()
        .map(|(kind, key, value)| SnapshotRecord { kind, key, value })
        .collect();
    let json = serde_json::to_vec_pretty(&records).map_err(StoreError::Snapshot)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
