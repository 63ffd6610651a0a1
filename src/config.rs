//! Configuration module

use std::path::PathBuf;

use crate::constants;
use crate::logic::privacy::PrivacyParameters;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Biometric server base URL
    pub server_url: String,

    /// Where the detector loads its weights from
    pub model_uri: String,

    /// HTTP timeout in seconds
    pub timeout_seconds: u64,

    /// CSRF token forwarded as `X-CSRFToken`
    pub csrf_token: Option<String>,

    /// Differential privacy settings
    pub privacy: PrivacyParameters,

    /// Directory for the durable store
    pub data_dir: PathBuf,
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            server_url: constants::get_server_url(),
            model_uri: constants::get_model_uri(),
            timeout_seconds: constants::get_http_timeout(),
            csrf_token: constants::get_csrf_token(),
            privacy: PrivacyParameters::with_epsilon(constants::get_privacy_epsilon()),
            data_dir: constants::get_data_dir(),
        }
    }

    /// Durable store file inside the data directory
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("durable_store.json")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: constants::DEFAULT_SERVER_URL.to_string(),
            model_uri: constants::DEFAULT_MODEL_URI.to_string(),
            timeout_seconds: constants::DEFAULT_HTTP_TIMEOUT,
            csrf_token: None,
            privacy: PrivacyParameters::default(),
            data_dir: PathBuf::from("."),
        }
    }
}
