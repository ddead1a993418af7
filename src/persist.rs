//! Saving and restoring the store through a string key-value collaborator.
//!
//! The persisted form is a versioned JSON envelope holding the row ids, the id → row map, the
//! column registry, the provenance and the last mutation time. Loading never fails: missing,
//! unreadable, corrupt or version-mismatched data yields a fresh [`Store`].

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::LabResult;
use crate::store::Store;
use crate::types::{ColumnDef, Provenance, Row};

/// Key the store is saved under unless the caller picks another.
pub const DEFAULT_KEY: &str = "pokemon-research-lab";
/// Current snapshot format version. Snapshots with any other version are discarded on load.
pub const SNAPSHOT_VERSION: u32 = 1;

/// String values stored under string keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> LabResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> LabResult<()>;
    fn remove(&self, key: &str) -> LabResult<()>;
}

/// Process-local [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> LabResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> LabResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> LabResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// [`KeyValueStore`] keeping one `<key>.json` file per key inside a directory.
///
/// The directory is created on first write. Characters outside `[A-Za-z0-9_-]` in a key are
/// replaced with `_` to form the file name.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> LabResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> LabResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> LabResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Serializable copy of a [`Store`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub row_ids: Vec<i64>,
    pub rows_by_id: HashMap<i64, Row>,
    pub columns: Vec<ColumnDef>,
    pub source: Provenance,
    #[serde(default)]
    pub last_updated_at: Option<u64>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    state: StoreSnapshot,
    version: u32,
}

impl Store {
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            row_ids: self.row_ids().to_vec(),
            rows_by_id: self
                .rows_by_id()
                .iter()
                .map(|(id, row)| (*id, Row::clone(row)))
                .collect(),
            columns: self.columns().to_vec(),
            source: self.provenance(),
            last_updated_at: self.last_updated_at(),
        }
    }

    /// Rebuild a store from a snapshot, dropping ids and rows that do not pair up.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let rows_by_id = snapshot
            .rows_by_id
            .into_iter()
            .map(|(id, row)| (id, Arc::new(row)))
            .collect();
        Store::from_parts(
            snapshot.row_ids,
            rows_by_id,
            snapshot.columns,
            snapshot.source,
            snapshot.last_updated_at,
        )
    }
}

/// Serialize `store` under `key`.
pub fn save_store(kv: &dyn KeyValueStore, key: &str, store: &Store) -> LabResult<()> {
    let envelope = Envelope {
        state: store.snapshot(),
        version: SNAPSHOT_VERSION,
    };
    kv.set(key, &serde_json::to_string(&envelope)?)
}

/// Load the store saved under `key`.
///
/// Returns `Ok(None)` when nothing is stored or the stored version differs; I/O and JSON errors
/// are returned as-is.
pub fn try_load_store(kv: &dyn KeyValueStore, key: &str) -> LabResult<Option<Store>> {
    let Some(raw) = kv.get(key)? else {
        return Ok(None);
    };
    let envelope: Envelope = serde_json::from_str(&raw)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Ok(None);
    }
    Ok(Some(Store::from_snapshot(envelope.state)))
}

/// Load the store saved under `key`, falling back to a fresh store on any problem.
pub fn load_store(kv: &dyn KeyValueStore, key: &str) -> Store {
    try_load_store(kv, key).ok().flatten().unwrap_or_default()
}

/// Forget whatever is saved under `key`.
pub fn clear_store(kv: &dyn KeyValueStore, key: &str) -> LabResult<()> {
    kv.remove(key)
}
