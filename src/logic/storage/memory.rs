//! In-memory store for both scopes

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{KeyValueStore, StorageScope};
use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(StorageScope, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything in `scope` (e.g. simulated session end)
    pub fn clear_scope(&self, scope: StorageScope) {
        self.entries.write().retain(|(s, _), _| *s != scope);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: StorageScope, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(&(scope, key.to_string())).cloned())
    }

    fn set(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.write().insert((scope, key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(&(scope, key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_separate() {
        let store = MemoryStore::new();
        store.set(StorageScope::Session, "k", "session").unwrap();
        store.set(StorageScope::Durable, "k", "durable").unwrap();

        assert_eq!(store.get(StorageScope::Session, "k").unwrap().as_deref(), Some("session"));
        assert_eq!(store.get(StorageScope::Durable, "k").unwrap().as_deref(), Some("durable"));

        store.clear_scope(StorageScope::Session);
        assert!(store.get(StorageScope::Session, "k").unwrap().is_none());
        assert!(store.get(StorageScope::Durable, "k").unwrap().is_some());

        store.remove(StorageScope::Durable, "k").unwrap();
        assert!(store.get(StorageScope::Durable, "k").unwrap().is_none());
    }
}
