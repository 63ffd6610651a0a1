//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Protocol constants (dimension, thresholds, buffer sizes) are fixed here and
//! are not read from the environment.

/// Default biometric server URL
///
/// This is the fallback URL when no environment variable is set.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default location of the face detection model weights
pub const DEFAULT_MODEL_URI: &str = "/static/face-api-models";

/// Model version used when the server cannot be asked
pub const DEFAULT_MODEL_VERSION: &str = "v1.0.0";

/// Default HTTP timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;

/// Default differential privacy budget
pub const DEFAULT_PRIVACY_EPSILON: f64 = 1.0;

/// Sensitivity of the local gradient computation
pub const PRIVACY_SENSITIVITY: f64 = 0.1;

/// Face descriptor size
pub const EMBEDDING_DIMENSION: usize = 128;

/// Detections below this score are rejected outright
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.5;

/// Maximum number of locally retained training samples
pub const TRAINING_BUFFER_CAPACITY: usize = 10;

/// Minimum samples before a gradient is computed
pub const MIN_TRAINING_SAMPLES: usize = 5;

/// AES-GCM nonce length (bytes)
pub const NONCE_LENGTH: usize = 12;

/// AES-256 key length (bytes)
pub const KEY_LENGTH: usize = 32;

// ============================================
// Storage keys
// ============================================

/// Session-scoped key holding the hex-encoded session key
pub const SESSION_KEY_STORAGE_KEY: &str = "biometric_encryption_key";

/// Durable key holding the consent flag
pub const CONSENT_STORAGE_KEY: &str = "federated_training_consent";

/// App name
pub const APP_NAME: &str = "Federated Biometric Client";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get server URL from environment or use default
pub fn get_server_url() -> String {
    std::env::var("BIOMETRIC_SERVER_URL")
        .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string())
}

/// Get model URI from environment or use default
pub fn get_model_uri() -> String {
    std::env::var("BIOMETRIC_MODEL_URI")
        .unwrap_or_else(|_| DEFAULT_MODEL_URI.to_string())
}

/// Get HTTP timeout from environment or use default
pub fn get_http_timeout() -> u64 {
    std::env::var("BIOMETRIC_HTTP_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT)
}

/// Get CSRF token from environment (optional)
pub fn get_csrf_token() -> Option<String> {
    std::env::var("BIOMETRIC_CSRF_TOKEN")
        .ok()
        .filter(|s| !s.is_empty())
}

/// Get privacy epsilon from environment or use default
///
/// Non-positive or unparsable values fall back to the default.
pub fn get_privacy_epsilon() -> f64 {
    match std::env::var("FEDERATED_PRIVACY_EPSILON") {
        Ok(raw) => match raw.parse::<f64>() {
            Ok(eps) if eps > 0.0 && eps.is_finite() => eps,
            _ => {
                log::warn!("Ignoring invalid FEDERATED_PRIVACY_EPSILON={}, using {}", raw, DEFAULT_PRIVACY_EPSILON);
                DEFAULT_PRIVACY_EPSILON
            }
        },
        Err(_) => DEFAULT_PRIVACY_EPSILON,
    }
}

/// Get data directory from environment or use the platform default
pub fn get_data_dir() -> std::path::PathBuf {
    std::env::var("BIOMETRIC_DATA_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join("federated-biometric")
        })
}
