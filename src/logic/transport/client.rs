//! Biometric API Client
//!
//! HTTP client for the verification, registration and federated endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    BiometricRequest, GradientSubmission, ModelInfo, ModelUpdate, RegistrationResult, VerificationResult,
};
use super::BiometricTransport;
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub server_url: String,
    pub csrf_token: Option<String>,
    pub timeout_seconds: u64,
}

impl From<&ClientConfig> for TransportConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            server_url: config.server_url.trim_end_matches('/').to_string(),
            csrf_token: config.csrf_token.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

pub struct HttpTransport {
    config: TransportConfig,
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TransportError::NetworkError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.server_url, path)
    }

    fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> reqwest::RequestBuilder {
        let mut request = self.http_client.post(self.url(path)).json(body);
        if let Some(token) = &self.config.csrf_token {
            request = request.header("X-CSRFToken", token);
        }
        request
    }

    /// POST and decode the JSON body. Error statuses still carry a
    /// `{verified|success: false, error}` body, so decoding is attempted first.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.post(path, body).send().await.map_err(|e| TransportError::NetworkError(e.to_string()))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| TransportError::NetworkError(e.to_string()))?;

        match serde_json::from_slice::<R>(&bytes) {
            Ok(result) => {
                if !status.is_success() {
                    log::warn!("{} returned {} with a result body", path, status);
                }
                Ok(result)
            }
            Err(_) if !status.is_success() => Err(TransportError::ServerError(status.as_u16())),
            Err(e) => Err(TransportError::ParseError(e.to_string())),
        }
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, TransportError> {
        let response = self
            .http_client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| TransportError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            response.json().await.map_err(|e| TransportError::ParseError(e.to_string()))
        } else {
            Err(TransportError::ServerError(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl BiometricTransport for HttpTransport {
    async fn verify(&self, request: &BiometricRequest) -> Result<VerificationResult, TransportError> {
        log::info!("Sending encrypted biometric data to server (no raw image)...");
        self.post_json("/api/verify-biometric/", request).await
    }

    async fn register(&self, request: &BiometricRequest) -> Result<RegistrationResult, TransportError> {
        log::info!("Registering biometric data (encrypted)...");
        self.post_json("/api/register-biometric/", request).await
    }

    async fn submit_gradients(&self, submission: &GradientSubmission) -> Result<(), TransportError> {
        let response = self
            .post("/api/federated-gradients/", submission)
            .send()
            .await
            .map_err(|e| TransportError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            log::error!("Gradient submission rejected ({}): {}", status, error_text);
            Err(TransportError::ServerError(status))
        }
    }

    async fn model_info(&self) -> Result<ModelInfo, TransportError> {
        self.get_json("/api/federated-model-info/").await
    }

    async fn fetch_model(&self, version: &str) -> Result<ModelUpdate, TransportError> {
        self.get_json(&format!("/api/federated-model/{}/", version)).await
    }
}
