//! Local key-value persistence.
//!
//! Values are JSON text stored under short string keys. The file backend keeps
//! one `<key>.json` file per key inside a data directory; the memory backend
//! keeps everything in-process.

use serde::{Serialize, de::DeserializeOwned};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

pub const SETTINGS_KEY: &str = "timerSettings";
pub const STATS_KEY: &str = "timerStats";

pub trait KeyValueStore {
    /// Raw JSON text stored under `key`, or `None` if nothing was saved yet.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace whatever is stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Directory of JSON files, one per key.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Decode the value under `key`. A missing key is `Ok(None)`; malformed JSON
/// is an error the caller decides how to recover from.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json { key: key.to_string(), source })
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, data: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(data)
        .map_err(|source| StoreError::Json { key: key.to_string(), source })?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let sample = Sample { name: "a".into(), count: 3 };
        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            save_json(&store, "sample", &sample).unwrap();
        }
        let store = JsonFileStore::new(dir.path()).unwrap();
        let loaded: Option<Sample> = load_json(&store, "sample").unwrap();
        assert_eq!(loaded, Some(sample));
        assert!(dir.path().join("sample.json").exists());
        assert!(!dir.path().join("sample.json.tmp").exists());
    }

    #[test]
    fn file_store_creates_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = JsonFileStore::new(&nested).unwrap();
        store.set("k", "1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let store = MemoryStore::new();
        store.set("sample", "{not json").unwrap();
        let loaded = load_json::<Sample>(&store, "sample");
        assert!(matches!(loaded, Err(StoreError::Json { .. })));
    }

    #[test]
    fn set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }
}
