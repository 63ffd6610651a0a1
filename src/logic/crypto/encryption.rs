//! Encryption Service - AES-256-GCM over feature samples
//!
//! Nonces are a random 32-bit prefix drawn per session key followed by a
//! 64-bit big-endian counter. A nonce is never reused for the lifetime of a key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

use super::keystore::{KeyStore, SessionKey};
use crate::constants::NONCE_LENGTH;
use crate::error::{BiometricError, BiometricResult};
use crate::logic::features::FeatureSample;

const NONCE_PREFIX_LENGTH: usize = NONCE_LENGTH - 8;

/// Encrypted sample plus the routing metadata that travels in clear
#[derive(Debug, Clone, Serialize)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; NONCE_LENGTH],
    pub confidence: f32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub model_version: String,
}

/// Nonce sequence for one key
#[derive(Default)]
struct NonceRegistry {
    key_fingerprint: Option<String>,
    prefix: [u8; NONCE_PREFIX_LENGTH],
    counter: u64,
}

impl NonceRegistry {
    /// Next nonce never issued under `key`
    fn next(&mut self, key: &SessionKey) -> BiometricResult<[u8; NONCE_LENGTH]> {
        let fingerprint = key.fingerprint();
        if self.key_fingerprint.as_deref() != Some(fingerprint.as_str()) {
            self.key_fingerprint = Some(fingerprint);
            OsRng.fill_bytes(&mut self.prefix);
            self.counter = 0;
        }

        let sequence = self.counter;
        self.counter = sequence
            .checked_add(1)
            .ok_or_else(|| BiometricError::EncryptionFailure("nonce space exhausted for session key".to_string()))?;

        let mut bytes = [0u8; NONCE_LENGTH];
        bytes[..NONCE_PREFIX_LENGTH].copy_from_slice(&self.prefix);
        bytes[NONCE_PREFIX_LENGTH..].copy_from_slice(&sequence.to_be_bytes());
        Ok(bytes)
    }

    fn len(&self) -> usize {
        self.counter as usize
    }
}

pub struct EncryptionService {
    keystore: Arc<KeyStore>,
    nonces: Mutex<NonceRegistry>,
    encryption_count: AtomicU64,
}

impl EncryptionService {
    pub fn new(keystore: Arc<KeyStore>) -> Self {
        Self {
            keystore,
            nonces: Mutex::new(NonceRegistry::default()),
            encryption_count: AtomicU64::new(0),
        }
    }

    /// Number of `encrypt` calls made on this service
    pub fn encryption_count(&self) -> u64 {
        self.encryption_count.load(Ordering::Relaxed)
    }

    /// Nonces issued under the current key
    pub fn issued_nonces(&self) -> usize {
        self.nonces.lock().len()
    }

    /// Encrypt `sample` under the session key.
    ///
    /// Never retried internally; on failure the caller starts over with a
    /// fresh sample.
    pub fn encrypt(&self, sample: &FeatureSample) -> BiometricResult<EncryptedPayload> {
        self.encryption_count.fetch_add(1, Ordering::Relaxed);

        let plaintext = serde_json::to_vec(sample)
            .map_err(|e| BiometricError::EncryptionFailure(format!("serialization failed: {}", e)))?;

        let key = self.keystore.get_or_create_key()?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| BiometricError::EncryptionFailure(format!("cipher error: {}", e)))?;

        let iv = self.nonces.lock().next(&key)?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_ref())
            .map_err(|e| {
                log::error!("Encryption failed: {}", e);
                BiometricError::EncryptionFailure(e.to_string())
            })?;

        log::debug!("Biometric features encrypted locally ({} bytes)", ciphertext.len());

        Ok(EncryptedPayload {
            ciphertext,
            iv,
            confidence: sample.confidence(),
            timestamp: sample.timestamp(),
            model_version: sample.model_version().to_string(),
        })
    }

    /// Decrypt a payload produced under the current session key
    pub fn decrypt(&self, payload: &EncryptedPayload) -> BiometricResult<Vec<u8>> {
        let key = self.keystore.get_or_create_key()?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| BiometricError::EncryptionFailure(format!("cipher error: {}", e)))?;

        cipher
            .decrypt(Nonce::from_slice(&payload.iv), payload.ciphertext.as_ref())
            .map_err(|_| BiometricError::EncryptionFailure("decryption failed (wrong key or tampered data)".to_string()))
    }
}
