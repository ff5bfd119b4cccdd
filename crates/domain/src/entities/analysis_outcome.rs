//! Analysis outcome and attempt records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::hazard::Hazard;
use crate::value_objects::{BackendId, RequestId, RiskLevel};

/// How a single backend attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// Backend returned a usable output
    Success,
    /// Attempt exceeded its timeout
    Timeout,
    /// Backend returned an operational error
    Error,
    /// Candidate never started (budget exhausted before its turn)
    Skipped,
}

/// Audit record of one backend attempt within a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Which backend was tried
    pub backend_id: BackendId,
    /// When the attempt started
    pub started_at: DateTime<Utc>,
    /// When the attempt ended
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
    /// How the attempt ended
    pub outcome: AttemptOutcome,
    /// Stable error label for Timeout and Error outcomes, and for skips
    /// caused by cooperative cancellation (`"cancelled"`); `None` for
    /// successes and for candidates that were never invoked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl AttemptRecord {
    /// Record a candidate that was skipped without being invoked
    #[must_use]
    pub fn skipped(backend_id: BackendId) -> Self {
        let now = Utc::now();
        Self {
            backend_id,
            started_at: now,
            ended_at: now,
            elapsed_ms: 0,
            outcome: AttemptOutcome::Skipped,
            error_kind: None,
        }
    }
}

/// The result returned to the caller for every analyze call
///
/// `degraded = true` means no backend fully succeeded and the hazards are a
/// safe-default or partial set; the caller treats it as usable but
/// lower-confidence, never as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Request this outcome answers
    pub request_id: RequestId,
    /// Merged hazard list (union semantics, never silently dropped)
    pub hazards: Vec<Hazard>,
    /// Maximum severity across hazards, Low when empty
    pub overall_risk: RiskLevel,
    /// Aggregate confidence in `[0, 1]`
    pub confidence: f32,
    /// Backends whose output contributed to the hazards
    pub contributing_backends: Vec<BackendId>,
    /// End-to-end processing time in milliseconds
    pub processing_time_ms: u64,
    /// Whether this is a safe-default / partial result
    pub degraded: bool,
    /// Full per-backend attempt history for diagnostics
    pub attempts: Vec<AttemptRecord>,
}

impl AnalysisOutcome {
    /// Build an outcome from merged hazards, deriving the overall risk
    #[must_use]
    pub fn from_hazards(
        request_id: RequestId,
        hazards: Vec<Hazard>,
        confidence: f32,
        contributing_backends: Vec<BackendId>,
        processing_time_ms: u64,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        let overall_risk = RiskLevel::from_severities(hazards.iter().map(|h| h.severity));
        Self {
            request_id,
            hazards,
            overall_risk,
            confidence: confidence.clamp(0.0, 1.0),
            contributing_backends,
            processing_time_ms,
            degraded: false,
            attempts,
        }
    }

    /// Build the degraded outcome returned when every backend failed
    #[must_use]
    pub fn degraded(
        request_id: RequestId,
        processing_time_ms: u64,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            request_id,
            hazards: Vec::new(),
            overall_risk: RiskLevel::Low,
            confidence: 0.0,
            contributing_backends: Vec::new(),
            processing_time_ms,
            degraded: true,
            attempts,
        }
    }
}
