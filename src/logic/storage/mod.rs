//! Storage Module - scoped key-value persistence
//!
//! Two scopes: `Session` lives as long as the client instance, `Durable`
//! survives restarts.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;

/// Lifetime of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    Session,
    Durable,
}

/// Abstract key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, scope: StorageScope, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StorageError>;
}
