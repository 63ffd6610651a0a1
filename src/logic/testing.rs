//! Test doubles for the external collaborators

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::logic::features::{Detection, DetectorError, FaceDetector, ImageFrame};
use crate::logic::transport::{
    BiometricRequest, BiometricTransport, GradientSubmission, ModelInfo, ModelUpdate, RegistrationResult,
    VerificationResult,
};

// ============================================================================
// DETECTOR
// ============================================================================

#[derive(Default)]
pub struct FakeDetector {
    detection: Mutex<Option<Detection>>,
    failing_loads: AtomicUsize,
    load_calls: AtomicUsize,
    detect_calls: AtomicUsize,
}

impl FakeDetector {
    pub fn with_detection(embedding: Vec<f32>, confidence: f32) -> Arc<Self> {
        let detector = Self::default();
        *detector.detection.lock() = Some(Detection { embedding, confidence });
        Arc::new(detector)
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_loads(&self, count: usize) {
        self.failing_loads.store(count, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceDetector for FakeDetector {
    async fn load_model(&self, _uri: &str) -> Result<(), DetectorError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(DetectorError("weights unavailable".to_string()));
        }
        Ok(())
    }

    async fn detect(&self, _image: &ImageFrame) -> Result<Option<Detection>, DetectorError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detection.lock().clone())
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

pub struct FakeTransport {
    verified: AtomicBool,
    registered: AtomicBool,
    fail_gradients: AtomicBool,
    hang_gradients: AtomicBool,
    yield_gradients: AtomicBool,
    model_version: Mutex<Option<String>>,
    known_models: Mutex<Vec<String>>,
    verify_requests: Mutex<Vec<BiometricRequest>>,
    register_requests: Mutex<Vec<BiometricRequest>>,
    gradient_submissions: Mutex<Vec<GradientSubmission>>,
    gradient_calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            verified: AtomicBool::new(true),
            registered: AtomicBool::new(true),
            fail_gradients: AtomicBool::new(false),
            hang_gradients: AtomicBool::new(false),
            yield_gradients: AtomicBool::new(false),
            model_version: Mutex::new(Some("v2.1.0".to_string())),
            known_models: Mutex::new(Vec::new()),
            verify_requests: Mutex::new(Vec::new()),
            register_requests: Mutex::new(Vec::new()),
            gradient_submissions: Mutex::new(Vec::new()),
            gradient_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_verified(&self, verified: bool) {
        self.verified.store(verified, Ordering::SeqCst);
    }

    pub fn fail_gradients(&self, fail: bool) {
        self.fail_gradients.store(fail, Ordering::SeqCst);
    }

    pub fn hang_gradients(&self, hang: bool) {
        self.hang_gradients.store(hang, Ordering::SeqCst);
    }

    /// Suspend once inside `submit_gradients` so other tasks run mid-flight
    pub fn yield_gradients(&self, yield_now: bool) {
        self.yield_gradients.store(yield_now, Ordering::SeqCst);
    }

    /// `None` makes the model-info endpoint fail
    pub fn set_model_version(&self, version: Option<&str>) {
        *self.model_version.lock() = version.map(str::to_string);
    }

    pub fn add_known_model(&self, version: &str) {
        self.known_models.lock().push(version.to_string());
    }

    pub fn verify_requests(&self) -> Vec<BiometricRequest> {
        self.verify_requests.lock().clone()
    }

    pub fn register_requests(&self) -> Vec<BiometricRequest> {
        self.register_requests.lock().clone()
    }

    pub fn gradient_submissions(&self) -> Vec<GradientSubmission> {
        self.gradient_submissions.lock().clone()
    }

    pub fn gradient_calls(&self) -> usize {
        self.gradient_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricTransport for FakeTransport {
    async fn verify(&self, request: &BiometricRequest) -> Result<VerificationResult, TransportError> {
        self.verify_requests.lock().push(request.clone());
        let verified = self.verified.load(Ordering::SeqCst);
        Ok(VerificationResult {
            verified,
            similarity: Some(if verified { 0.91 } else { 0.12 }),
            message: None,
            error: None,
        })
    }

    async fn register(&self, request: &BiometricRequest) -> Result<RegistrationResult, TransportError> {
        self.register_requests.lock().push(request.clone());
        Ok(RegistrationResult {
            success: self.registered.load(Ordering::SeqCst),
            message: None,
            embedding_id: Some(7),
            error: None,
        })
    }

    async fn submit_gradients(&self, submission: &GradientSubmission) -> Result<(), TransportError> {
        self.gradient_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_gradients.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.yield_gradients.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.fail_gradients.load(Ordering::SeqCst) {
            return Err(TransportError::ServerError(503));
        }
        self.gradient_submissions.lock().push(submission.clone());
        Ok(())
    }

    async fn model_info(&self) -> Result<ModelInfo, TransportError> {
        let version = self.model_version.lock().clone();
        match version {
            Some(version) => Ok(ModelInfo { version }),
            None => Err(TransportError::NetworkError("connection refused".to_string())),
        }
    }

    async fn fetch_model(&self, version: &str) -> Result<ModelUpdate, TransportError> {
        if self.known_models.lock().iter().any(|v| v == version) {
            Ok(ModelUpdate {
                version: Some(version.to_string()),
                extra: serde_json::Map::new(),
            })
        } else {
            Err(TransportError::ServerError(404))
        }
    }
}
