//! Federated training consent
//!
//! A single durable flag. It is read fresh on every decision, never cached.

use std::sync::Arc;

use crate::constants::CONSENT_STORAGE_KEY;
use crate::error::BiometricResult;
use crate::logic::storage::{KeyValueStore, StorageScope};

#[derive(Clone)]
pub struct ConsentState {
    store: Arc<dyn KeyValueStore>,
}

impl ConsentState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current consent. Missing, unreadable or non-"true" values mean no consent.
    pub fn get(&self) -> bool {
        match self.store.get(StorageScope::Durable, CONSENT_STORAGE_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                log::warn!("Could not read consent flag ({}), treating as withheld", e);
                false
            }
        }
    }

    pub fn set(&self, granted: bool) -> BiometricResult<()> {
        let value = if granted { "true" } else { "false" };
        self.store.set(StorageScope::Durable, CONSENT_STORAGE_KEY, value)?;
        log::info!("Federated training {}", if granted { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Flip the flag and return the new value
    pub fn toggle(&self) -> BiometricResult<bool> {
        let next = !self.get();
        self.set(next)?;
        Ok(next)
    }
}
