//! Session Key Store
//!
//! Exactly one AES-256 key per session, created on first use and kept in
//! the session scope only. Check-then-create runs under a single lock so two
//! first calls racing each other still observe the same key.

use std::sync::Arc;

use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::constants::{KEY_LENGTH, SESSION_KEY_STORAGE_KEY};
use crate::error::{BiometricError, BiometricResult};
use crate::logic::storage::{KeyValueStore, StorageScope};

/// 256-bit symmetric session key
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LENGTH]);

impl SessionKey {
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_LENGTH];
        bytes.copy_from_slice(key.as_slice());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// Short SHA-256 fingerprint, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..4])
    }

    fn encode(&self) -> String {
        hex::encode(self.0)
    }

    fn decode(raw: &str) -> Option<Self> {
        let bytes = hex::decode(raw.trim()).ok()?;
        let array: [u8; KEY_LENGTH] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey({})", self.fingerprint())
    }
}

pub struct KeyStore {
    store: Arc<dyn KeyValueStore>,
    create_guard: Mutex<()>,
}

impl KeyStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            create_guard: Mutex::new(()),
        }
    }

    /// Return the session key, generating and storing one if absent
    pub fn get_or_create_key(&self) -> BiometricResult<SessionKey> {
        let _guard = self.create_guard.lock();

        let existing = self
            .store
            .get(StorageScope::Session, SESSION_KEY_STORAGE_KEY)
            .map_err(|e| BiometricError::EncryptionFailure(format!("key lookup failed: {}", e)))?;

        if let Some(raw) = existing {
            match SessionKey::decode(&raw) {
                Some(key) => return Ok(key),
                None => {
                    // Unreadable key material: nothing encrypted under it can be
                    // decrypted anyway, so it is replaced.
                    log::warn!("Stored session key is malformed, generating a new one");
                }
            }
        }

        let key = SessionKey::generate();
        self.store
            .set(StorageScope::Session, SESSION_KEY_STORAGE_KEY, &key.encode())
            .map_err(|e| BiometricError::EncryptionFailure(format!("key store failed: {}", e)))?;

        log::info!("Session encryption key created ({})", key.fingerprint());
        Ok(key)
    }

    /// Forget the session key (session end)
    pub fn destroy(&self) -> BiometricResult<()> {
        let _guard = self.create_guard.lock();
        self.store.remove(StorageScope::Session, SESSION_KEY_STORAGE_KEY)?;
        log::info!("Session encryption key destroyed");
        Ok(())
    }
}
