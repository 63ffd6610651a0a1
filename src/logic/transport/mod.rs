//! Transport Module - biometric backend communication
//!
//! Only ciphertext, routing metadata and noised gradients cross this boundary.

pub mod client;
pub mod types;

pub use client::{HttpTransport, TransportConfig};
pub use types::{
    BiometricRequest, GradientSubmission, ModelInfo, ModelUpdate, RegistrationResult, VerificationResult,
};

use async_trait::async_trait;

use crate::error::TransportError;

/// Backend endpoints consumed by the client
#[async_trait]
pub trait BiometricTransport: Send + Sync {
    async fn verify(&self, request: &BiometricRequest) -> Result<VerificationResult, TransportError>;

    async fn register(&self, request: &BiometricRequest) -> Result<RegistrationResult, TransportError>;

    /// Any 2xx is an acknowledgment
    async fn submit_gradients(&self, submission: &GradientSubmission) -> Result<(), TransportError>;

    async fn model_info(&self) -> Result<ModelInfo, TransportError>;

    async fn fetch_model(&self, version: &str) -> Result<ModelUpdate, TransportError>;
}
