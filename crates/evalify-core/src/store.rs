//! Named key-value persistence.
//!
//! Each component owns exactly one key name and stores a single JSON blob
//! under it. Reads are forgiving: a missing, unreadable, or malformed blob is
//! reported as absent so the owning component starts from an empty
//! collection. Writes are not: they surface a `StoreError`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Key owned by the result store.
pub const RESULTS_KEY: &str = "results";
/// Key owned by the answer-key registry.
pub const CUSTOM_KEYS_KEY: &str = "custom-answer-keys";
/// Key owned by the notification log.
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Generic get/set persistence contract.
pub trait KvStore: Send + Sync {
    /// Fetch the blob stored under `name`. Malformed data reads as `None`.
    fn get(&self, name: &str) -> Option<Value>;

    /// Replace the blob stored under `name`.
    fn set(&self, name: &str, value: Value) -> Result<(), StoreError>;
}

/// Decode the blob under `name`, falling back to `T::default()` when it is
/// absent or does not match the expected shape.
pub fn load_or_default<T>(store: &dyn KvStore, name: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(value) = store.get(name) else {
        return T::default();
    };
    match serde_json::from_value(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("stored '{name}' has unexpected shape, treating as empty: {e}");
            T::default()
        }
    }
}

/// Encode `value` and write it under `name`.
pub fn save<T: Serialize>(store: &dyn KvStore, name: &str, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
        name: name.to_string(),
        source,
    })?;
    store.set(name, json)
}

/// In-memory store, used by tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, name: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(name.to_string(), value);
        Ok(())
    }
}

/// Directory-backed store: one `<name>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, name: &str) -> Option<Value> {
        let path = self.path_for(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("failed to read {}, treating as empty: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("malformed JSON in {}, treating as empty: {e}", path.display());
                None
            }
        }
    }

    fn set(&self, name: &str, value: Value) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            name: name.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.root).map_err(io_err)?;

        let json = serde_json::to_string_pretty(&value).map_err(|source| {
            StoreError::Serialization {
                name: name.to_string(),
                source,
            }
        })?;

        // Write beside the target and rename so readers never see a torn file.
        let path = self.path_for(name);
        let tmp = self.root.join(format!(".{name}.json.tmp"));
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}
