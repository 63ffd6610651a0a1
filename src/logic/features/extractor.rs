//! Feature Extractor - on-device face embedding
//!
//! Wraps the external detection model behind [`FaceDetector`] and enforces
//! the confidence gate. Images never leave this module; only the embedding does.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::embedding::{Embedding, FeatureSample};
use crate::constants::{DEFAULT_MODEL_VERSION, EMBEDDING_DIMENSION, MIN_DETECTION_CONFIDENCE};
use crate::error::{BiometricError, BiometricResult};

// ============================================================================
// DETECTOR CAPABILITY
// ============================================================================

/// Raw frame handed to the detector (RGBA, row-major)
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }
}

/// Single face detection as reported by the model
#[derive(Debug, Clone)]
pub struct Detection {
    pub embedding: Vec<f32>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct DetectorError(pub String);

/// External face detection + recognition model
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Load model weights from `uri`
    async fn load_model(&self, uri: &str) -> Result<(), DetectorError>;

    /// Detect a single face; `Ok(None)` when no face is found
    async fn detect(&self, image: &ImageFrame) -> Result<Option<Detection>, DetectorError>;
}

// ============================================================================
// MODEL HANDLE
// ============================================================================

/// Lazily initialized detector.
///
/// A failed load leaves the cell empty so the next call tries again.
pub struct ModelHandle {
    detector: Arc<dyn FaceDetector>,
    model_uri: String,
    ready: OnceCell<()>,
}

impl ModelHandle {
    pub fn new(detector: Arc<dyn FaceDetector>, model_uri: impl Into<String>) -> Self {
        Self {
            detector,
            model_uri: model_uri.into(),
            ready: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.ready.initialized()
    }

    /// Load the model if needed. Concurrent callers share a single load.
    pub async fn ensure_loaded(&self) -> BiometricResult<()> {
        self.ready
            .get_or_try_init(|| async {
                log::info!("Initializing biometric model from {}...", self.model_uri);
                self.detector
                    .load_model(&self.model_uri)
                    .await
                    .map_err(|e| {
                        log::error!("Failed to initialize biometric model: {}", e);
                        BiometricError::ModelInitFailure(e.0)
                    })?;
                log::info!("Biometric model initialized");
                Ok::<(), BiometricError>(())
            })
            .await?;
        Ok(())
    }

    pub(crate) fn detector(&self) -> &Arc<dyn FaceDetector> {
        &self.detector
    }
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// Turns an image into a quality-gated [`FeatureSample`]
pub struct FeatureExtractor {
    model: ModelHandle,
    model_version: RwLock<String>,
}

impl FeatureExtractor {
    pub fn new(model: ModelHandle) -> Self {
        Self {
            model,
            model_version: RwLock::new(DEFAULT_MODEL_VERSION.to_string()),
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Version stamped onto every sample
    pub fn model_version(&self) -> String {
        self.model_version.read().clone()
    }

    pub fn set_model_version(&self, version: impl Into<String>) {
        *self.model_version.write() = version.into();
    }

    /// Extract an embedding from `image`.
    ///
    /// Fails with `NoFaceDetected`, `LowConfidence` (< 0.5) or
    /// `ModelContractViolation` (wrong dimension, non-finite output).
    pub async fn extract(&self, image: &ImageFrame) -> BiometricResult<FeatureSample> {
        self.model.ensure_loaded().await?;

        log::debug!("Extracting biometric features locally ({}x{})", image.width, image.height);

        let detection = self
            .model
            .detector()
            .detect(image)
            .await
            .map_err(|e| BiometricError::DetectionFailure(e.0))?
            .ok_or(BiometricError::NoFaceDetected)?;

        let confidence = detection.confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(BiometricError::ModelContractViolation(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }
        if confidence < MIN_DETECTION_CONFIDENCE {
            log::info!("Rejecting detection with confidence {:.1}%", confidence * 100.0);
            return Err(BiometricError::LowConfidence { confidence });
        }

        let embedding = Embedding::from_slice(&detection.embedding).ok_or_else(|| {
            BiometricError::ModelContractViolation(format!(
                "expected {} embedding components, got {}",
                EMBEDDING_DIMENSION,
                detection.embedding.len()
            ))
        })?;
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(BiometricError::ModelContractViolation(
                "embedding contains non-finite components".to_string(),
            ));
        }

        log::info!("Face detected with confidence: {:.1}%", confidence * 100.0);

        FeatureSample::new(embedding, confidence, self.model_version())
    }
}
