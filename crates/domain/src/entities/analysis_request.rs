//! Analysis request entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RequestId, WorkType};

/// One captured image submitted for safety analysis
///
/// Immutable once created; owned by a single orchestration run for its
/// duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Unique request identifier
    pub request_id: RequestId,
    /// Encoded image bytes (JPEG or PNG as captured)
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Category of work in the photo
    pub work_type: WorkType,
    /// When the capture collaborator submitted the request
    pub submitted_at: DateTime<Utc>,
    /// Total wall-clock budget for the whole analyze call, in milliseconds
    pub global_deadline_ms: u64,
    /// Run multiple backends and merge instead of first-success
    #[serde(default)]
    pub ensemble: bool,
    /// In ensemble mode, stop collecting after this many successes
    #[serde(default = "default_max_ensemble_successes")]
    pub max_ensemble_successes: usize,
}

const fn default_max_ensemble_successes() -> usize {
    2
}

impl AnalysisRequest {
    /// Create a single-shot request with a fresh id
    #[must_use]
    pub fn new(
        image_bytes: Vec<u8>,
        width: u32,
        height: u32,
        work_type: WorkType,
        global_deadline_ms: u64,
    ) -> Self {
        Self {
            request_id: RequestId::new(),
            image_bytes,
            width,
            height,
            work_type,
            submitted_at: Utc::now(),
            global_deadline_ms,
            ensemble: false,
            max_ensemble_successes: default_max_ensemble_successes(),
        }
    }

    /// Enable ensemble mode for this request
    #[must_use]
    pub const fn with_ensemble(mut self, max_successes: usize) -> Self {
        self.ensemble = true;
        self.max_ensemble_successes = max_successes;
        self
    }

    /// Validate caller-supplied fields
    ///
    /// The only fatal, caller-visible error path of the engine.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.image_bytes.is_empty() {
            return Err(DomainError::EmptyImage);
        }
        if self.width == 0 || self.height == 0 {
            return Err(DomainError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.global_deadline_ms == 0 {
            return Err(DomainError::InvalidDeadline(self.global_deadline_ms));
        }
        Ok(())
    }
}
