//! Cloud vision backend
//!
//! HTTP client for the hosted hazard-detection API. The image travels as a
//! raw request body with metadata in headers; the response is a JSON
//! detection list mapped into domain hazards.

use std::time::Duration;

use async_trait::async_trait;
use domain::{AnalysisRequest, BackendId, BoundingRegion, DeviceTier, Hazard, Severity};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::AnalysisError;
use crate::ports::{
    BackendDescriptor, BackendKind, CancelToken, InferenceBackend, RawBackendOutput,
};

/// Cloud vision API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudVisionConfig {
    /// Base URL of the vision API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token, when the deployment requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Remote model to request
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_model() -> String {
    "hazard-vision-large".to_string()
}

const fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for CloudVisionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// One detection in the API response
#[derive(Debug, Deserialize)]
struct WireDetection {
    label: String,
    severity: Severity,
    confidence: f32,
    #[serde(default)]
    region: Option<WireRegion>,
}

/// Normalized box as the API reports it
#[derive(Debug, Deserialize)]
struct WireRegion {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

/// Top-level analysis response
#[derive(Debug, Deserialize)]
struct WireAnalysisResponse {
    detections: Vec<WireDetection>,
    confidence: f32,
    #[serde(default)]
    model: Option<String>,
}

/// `InferenceBackend` over the hosted vision API
pub struct CloudVisionBackend {
    client: Client,
    config: CloudVisionConfig,
}

impl std::fmt::Debug for CloudVisionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudVisionBackend")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl CloudVisionBackend {
    /// Create a client from configuration
    pub fn new(config: CloudVisionConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AnalysisError::Configuration(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Well-known id of the cloud vision backend
    pub fn id() -> BackendId {
        // The literal is valid by construction.
        BackendId::new("cloud-vision").unwrap_or_else(|_| unreachable!())
    }

    /// Descriptor for registration
    #[must_use]
    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor::new(Self::id(), BackendKind::Cloud)
            .with_min_tier(DeviceTier::Low)
            .with_cost(5)
            .with_timeout_ms(self.config.timeout_ms)
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn map_send_error(&self, e: &reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::InferenceTimeout(self.config.timeout_ms)
        } else if e.is_connect() {
            AnalysisError::Network(format!("connect failed: {e}"))
        } else {
            AnalysisError::Network(e.to_string())
        }
    }

    fn map_status(status: StatusCode, body: &str, timeout_ms: u64) -> AnalysisError {
        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                AnalysisError::InferenceTimeout(timeout_ms)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AnalysisError::Configuration(format!("rejected credentials: {status}"))
            }
            _ => AnalysisError::Network(format!("status {status}: {body}")),
        }
    }

    fn into_hazards(detections: Vec<WireDetection>) -> Vec<Hazard> {
        detections
            .into_iter()
            .map(|d| {
                let mut hazard = Hazard::new(d.label, d.severity, d.confidence);
                if let Some(r) = d.region {
                    match BoundingRegion::new(r.left, r.top, r.right, r.bottom) {
                        Ok(region) => hazard = hazard.with_region(region),
                        // Detection survives without localization.
                        Err(e) => warn!(error = %e, label = %hazard.label, "dropping invalid region"),
                    }
                }
                hazard.with_source(Self::id())
            })
            .collect()
    }
}

#[async_trait]
impl InferenceBackend for CloudVisionBackend {
    async fn initialize(&self) -> Result<(), AnalysisError> {
        // Connections are pooled lazily; nothing to warm up.
        Ok(())
    }

    #[instrument(skip(self, request, cancel), fields(request_id = %request.request_id, model = %self.config.model))]
    async fn infer(
        &self,
        request: &AnalysisRequest,
        cancel: CancelToken,
    ) -> Result<RawBackendOutput, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        debug!(bytes = request.image_bytes.len(), "uploading image for analysis");

        let mut builder = self
            .client
            .post(self.api_url("analyze"))
            .header("content-type", "application/octet-stream")
            .header("x-request-id", request.request_id.to_string())
            .header("x-model", &self.config.model)
            .header("x-work-type", request.work_type.wire_name())
            .header("x-image-width", request.width)
            .header("x-image-height", request.height)
            .body(request.image_bytes.clone());

        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "cloud analysis failed");
            return Err(Self::map_status(status, &body, self.config.timeout_ms));
        }

        let wire: WireAnalysisResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Network(format!("malformed response: {e}")))?;

        debug!(detections = wire.detections.len(), "cloud analysis completed");

        Ok(RawBackendOutput {
            hazards: Self::into_hazards(wire.detections),
            confidence: wire.confidence.clamp(0.0, 1.0),
            model: wire.model.or_else(|| Some(self.config.model.clone())),
        })
    }

    async fn is_available(&self) -> bool {
        let response = self
            .client
            .get(self.api_url("health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        matches!(response, Ok(resp) if resp.status().is_success())
    }

    async fn shutdown(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}
