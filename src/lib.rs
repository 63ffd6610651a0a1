//! Federated Biometric Client
//!
//! Privacy-preserving face authentication: embeddings are extracted on the
//! device, encrypted before transmission, and optionally folded into
//! differentially-private federated updates. Raw images never leave the
//! process.

pub mod config;
pub mod constants;
pub mod error;
pub mod logic;

pub use config::ClientConfig;
pub use error::{BiometricError, BiometricResult, StorageError, TransportError};
pub use logic::auth::{AuthenticationOrchestrator, Collaborators};
pub use logic::federated::{ContributionOutcome, ContributionState};
pub use logic::features::{Detection, DetectorError, FaceDetector, ImageFrame};
pub use logic::storage::{FileStore, KeyValueStore, MemoryStore, StorageScope};
pub use logic::transport::{BiometricTransport, HttpTransport, RegistrationResult, VerificationResult};
