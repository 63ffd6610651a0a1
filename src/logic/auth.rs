//! Authentication Orchestrator - top-level entry point
//!
//! extract -> encrypt -> verify -> (on success) federated contribution.
//! Extraction and encryption failures abort the call; contribution failures
//! never do.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::constants::DEFAULT_MODEL_VERSION;
use crate::error::BiometricResult;
use crate::logic::consent::ConsentState;
use crate::logic::crypto::{EncryptionService, KeyStore};
use crate::logic::federated::{ContributionOutcome, FederatedContributor};
use crate::logic::features::{FaceDetector, FeatureExtractor, ImageFrame, ModelHandle};
use crate::logic::privacy::{PrivacyEngine, PrivacyParameters};
use crate::logic::storage::KeyValueStore;
use crate::logic::training::{BufferStatus, TrainingBuffer};
use crate::logic::transport::{BiometricRequest, BiometricTransport, RegistrationResult, VerificationResult};

/// Injected collaborators
pub struct Collaborators {
    pub detector: Arc<dyn FaceDetector>,
    pub transport: Arc<dyn BiometricTransport>,
    pub store: Arc<dyn KeyValueStore>,
}

pub struct AuthenticationOrchestrator {
    extractor: FeatureExtractor,
    encryption: EncryptionService,
    keystore: Arc<KeyStore>,
    consent: ConsentState,
    contributor: FederatedContributor,
    transport: Arc<dyn BiometricTransport>,
}

impl AuthenticationOrchestrator {
    pub fn new(config: &ClientConfig, collaborators: Collaborators) -> Self {
        Self::with_privacy_engine(config, collaborators, PrivacyEngine::new())
    }

    /// Same as `new` with an explicit noise source (seeded in tests)
    pub fn with_privacy_engine(config: &ClientConfig, collaborators: Collaborators, engine: PrivacyEngine) -> Self {
        let Collaborators { detector, transport, store } = collaborators;

        let keystore = Arc::new(KeyStore::new(store.clone()));
        let consent = ConsentState::new(store);
        let buffer = Arc::new(TrainingBuffer::new(consent.clone()));
        let contributor = FederatedContributor::new(
            consent.clone(),
            buffer,
            engine,
            config.privacy,
            transport.clone(),
        );

        Self {
            extractor: FeatureExtractor::new(ModelHandle::new(detector, config.model_uri.clone())),
            encryption: EncryptionService::new(keystore.clone()),
            keystore,
            consent,
            contributor,
            transport,
        }
    }

    // ------------------------------------------------------------------------
    // Model
    // ------------------------------------------------------------------------

    /// Load the detector if needed; on first load adopt the server's model version
    pub async fn ensure_model(&self) -> BiometricResult<()> {
        let fresh = !self.extractor.model().is_loaded();
        self.extractor.model().ensure_loaded().await?;
        if fresh {
            self.refresh_model_version().await;
        }
        Ok(())
    }

    /// Ask the server for the active model version, falling back to the default
    pub async fn refresh_model_version(&self) -> String {
        let version = match self.transport.model_info().await {
            Ok(info) => {
                log::info!("Using federated model version: {}", info.version);
                info.version
            }
            Err(e) => {
                log::warn!("Could not fetch model version ({}), using {}", e, DEFAULT_MODEL_VERSION);
                DEFAULT_MODEL_VERSION.to_string()
            }
        };
        self.extractor.set_model_version(version.clone());
        version
    }

    /// Switch to `new_version` if the server can serve it. Returns whether it switched.
    pub async fn update_model_version(&self, new_version: &str) -> bool {
        log::info!("Updating local model to version {}...", new_version);
        match self.transport.fetch_model(new_version).await {
            Ok(_) => {
                self.extractor.set_model_version(new_version);
                log::info!("Local model updated to {}", new_version);
                true
            }
            Err(e) => {
                log::error!("Failed to update local model: {}", e);
                false
            }
        }
    }

    pub fn model_version(&self) -> String {
        self.extractor.model_version()
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    pub async fn authenticate(&self, image: &ImageFrame, subject_id: &str) -> BiometricResult<VerificationResult> {
        self.ensure_model().await?;

        let sample = self.extractor.extract(image).await?;
        let payload = self.encryption.encrypt(&sample)?;

        let request = BiometricRequest::new(subject_id, payload);
        let result = self.transport.verify(&request).await?;

        if result.verified {
            log::info!("Biometric authentication successful");
            match self.contributor.contribute(&sample, sample.model_version()).await {
                ContributionOutcome::Failed { reason } => {
                    log::warn!("Federated contribution deferred: {}", reason);
                }
                outcome => log::debug!("Federated contribution: {:?}", outcome),
            }
        } else {
            log::info!("Biometric authentication failed");
        }

        Ok(result)
    }

    /// Same pipeline as `authenticate` up to encryption; never contributes
    pub async fn register(&self, image: &ImageFrame, subject_id: &str) -> BiometricResult<RegistrationResult> {
        self.ensure_model().await?;

        let sample = self.extractor.extract(image).await?;
        let payload = self.encryption.encrypt(&sample)?;

        let request = BiometricRequest::new(subject_id, payload);
        let result = self.transport.register(&request).await?;

        if result.success {
            log::info!("Biometric registration successful");
        } else {
            log::warn!("Biometric registration rejected: {}", result.error.as_deref().unwrap_or("no reason given"));
        }

        Ok(result)
    }

    // ------------------------------------------------------------------------
    // Consent & session
    // ------------------------------------------------------------------------

    pub fn set_consent(&self, granted: bool) -> BiometricResult<()> {
        self.consent.set(granted)
    }

    pub fn get_consent(&self) -> bool {
        self.consent.get()
    }

    pub fn toggle_consent(&self) -> BiometricResult<bool> {
        self.consent.toggle()
    }

    pub fn training_status(&self) -> BufferStatus {
        self.contributor.buffer().status()
    }

    /// Explicitly discard buffered training samples
    pub fn reset_training_buffer(&self) {
        self.contributor.buffer().clear();
        log::info!("Local training buffer reset");
    }

    /// Retry a pending contribution with what is already buffered
    pub async fn retry_contribution(&self) -> ContributionOutcome {
        self.contributor.flush(&self.model_version()).await
    }

    /// Destroy the session key
    pub fn end_session(&self) -> BiometricResult<()> {
        self.keystore.destroy()
    }

    pub fn encryption(&self) -> &EncryptionService {
        &self.encryption
    }

    pub fn contributor(&self) -> &FederatedContributor {
        &self.contributor
    }
}

/// Parameters used by the orchestrator, for display
pub fn describe_privacy(params: &PrivacyParameters) -> String {
    format!(
        "Laplace mechanism, epsilon={}, sensitivity={}, scale={}",
        params.epsilon,
        params.sensitivity,
        params.scale()
    )
}
