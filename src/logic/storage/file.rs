//! File-backed store
//!
//! Session values stay in memory. Durable values are a JSON map on disk,
//! rewritten in full on every change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use super::{KeyValueStore, StorageScope};
use crate::error::StorageError;

pub struct FileStore {
    path: PathBuf,
    session: RwLock<BTreeMap<String, String>>,
    durable: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the durable file at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let durable = load_map(&path)?;

        log::debug!("Durable store opened at {} ({} keys)", path.display(), durable.len());

        Ok(Self {
            path,
            session: RwLock::new(BTreeMap::new()),
            durable: Mutex::new(durable),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, scope: StorageScope, key: &str) -> Result<Option<String>, StorageError> {
        Ok(match scope {
            StorageScope::Session => self.session.read().get(key).cloned(),
            StorageScope::Durable => self.durable.lock().get(key).cloned(),
        })
    }

    fn set(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), StorageError> {
        match scope {
            StorageScope::Session => {
                self.session.write().insert(key.to_string(), value.to_string());
                Ok(())
            }
            StorageScope::Durable => {
                let mut durable = self.durable.lock();
                let mut next = durable.clone();
                next.insert(key.to_string(), value.to_string());
                save_map(&next, &self.path)?;
                *durable = next;
                Ok(())
            }
        }
    }

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError> {
        match scope {
            StorageScope::Session => {
                self.session.write().remove(key);
                Ok(())
            }
            StorageScope::Durable => {
                let mut durable = self.durable.lock();
                if !durable.contains_key(key) {
                    return Ok(());
                }
                let mut next = durable.clone();
                next.remove(key);
                save_map(&next, &self.path)?;
                *durable = next;
                Ok(())
            }
        }
    }
}

fn load_map(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

fn save_map(map: &BTreeMap<String, String>, path: &Path) -> Result<(), StorageError> {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(map)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set(StorageScope::Durable, "consent", "true").unwrap();
        store.set(StorageScope::Session, "key", "secret").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(StorageScope::Durable, "consent").unwrap().as_deref(), Some("true"));
        assert!(reopened.get(StorageScope::Session, "key").unwrap().is_none());
    }

    #[test]
    fn test_session_values_never_hit_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set(StorageScope::Session, "biometric_encryption_key", "abcd").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set(StorageScope::Durable, "a", "1").unwrap();
        store.remove(StorageScope::Durable, "a").unwrap();
        store.remove(StorageScope::Durable, "missing").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.get(StorageScope::Durable, "a").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(StorageError::ParseError(_))));
    }
}
