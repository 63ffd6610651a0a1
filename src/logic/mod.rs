//! Logic Module - biometric pipeline engines
//!
//! - `features/` - on-device extraction and confidence gating
//! - `crypto/` - session key and AES-GCM payload encryption
//! - `training/` + `privacy` + `federated/` - local buffer, update, noise, contribution
//! - `transport/` - backend endpoints
//! - `auth` - orchestration

pub mod auth;
pub mod consent;
pub mod crypto;
pub mod federated;
pub mod features;
pub mod privacy;
pub mod storage;
pub mod training;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
