//! Error handling

use thiserror::Error;

pub type BiometricResult<T> = Result<T, BiometricError>;

/// Failures surfaced to callers of the authentication flow
#[derive(Debug, Error)]
pub enum BiometricError {
    #[error("No face detected in image. Please ensure your face is clearly visible.")]
    NoFaceDetected,

    #[error("Face detection confidence too low ({confidence:.3}). Please use a clearer image with good lighting.")]
    LowConfidence { confidence: f32 },

    #[error("Detection model contract violated: {0}")]
    ModelContractViolation(String),

    #[error("Face detection failed: {0}")]
    DetectionFailure(String),

    #[error("Failed to initialize biometric model: {0}")]
    ModelInitFailure(String),

    #[error("Failed to encrypt biometric data: {0}")]
    EncryptionFailure(String),

    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Network-layer errors from the biometric backend
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Key-value store errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::ParseError(err.to_string())
    }
}
