//! Wire types for the biometric endpoints

use serde::{Deserialize, Serialize};

use crate::constants::{EMBEDDING_DIMENSION, NONCE_LENGTH};
use crate::logic::crypto::EncryptedPayload;
use crate::logic::features::embedding::fixed_array;
use crate::logic::privacy::NoisedGradient;

/// Body for `/api/verify-biometric/` and `/api/register-biometric/`
#[derive(Debug, Clone, Serialize)]
pub struct BiometricRequest {
    pub voter_id: String,
    pub encrypted_embedding: Vec<u8>,
    pub iv: [u8; NONCE_LENGTH],
    pub confidence: f32,
    pub model_version: String,
}

impl BiometricRequest {
    pub fn new(subject_id: &str, payload: EncryptedPayload) -> Self {
        Self {
            voter_id: subject_id.to_string(),
            encrypted_embedding: payload.ciphertext,
            iv: payload.iv,
            confidence: payload.confidence,
            model_version: payload.model_version,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body for `/api/federated-gradients/`
#[derive(Debug, Clone, Serialize)]
pub struct GradientSubmission {
    #[serde(with = "fixed_array")]
    pub gradients: [f64; EMBEDDING_DIMENSION],
    pub loss: f64,
    pub num_samples: usize,
    pub model_version: String,
}

impl GradientSubmission {
    /// Only noised gradients can be submitted
    pub fn new(update: &NoisedGradient, model_version: impl Into<String>) -> Self {
        Self {
            gradients: *update.weights(),
            loss: update.loss(),
            num_samples: update.num_samples(),
            model_version: model_version.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub version: String,
}

/// Model weights descriptor from `/api/federated-model/{version}/`.
/// Only the version is consumed; the rest is kept opaque.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelUpdate {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
