//! Crypto Module - session key lifecycle and payload encryption

pub mod encryption;
pub mod keystore;

pub use encryption::{EncryptedPayload, EncryptionService};
pub use keystore::{KeyStore, SessionKey};
