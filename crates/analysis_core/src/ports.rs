//! Port definitions for the orchestration engine
//!
//! Defines the traits (ports) that backend adapters and collaborators must
//! implement, plus the descriptor and output types shared across them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{AnalysisOutcome, AnalysisRequest, BackendId, DeviceTier, Hazard, RequestId, ThermalState};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Compute location and class of an inference backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// On-device neural accelerator
    LocalNpu,
    /// On-device GPU delegate
    LocalGpu,
    /// On-device CPU inference
    LocalCpu,
    /// Network-bound cloud vision API
    Cloud,
}

impl BackendKind {
    /// Whether this backend runs on the device itself
    #[must_use]
    pub const fn is_local(self) -> bool {
        !matches!(self, Self::Cloud)
    }
}

/// Static capability descriptor of a registered backend
///
/// Immutable after registration; the selector works entirely off
/// descriptors plus live health data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Registry key and audit label
    pub id: BackendId,
    /// Compute class
    pub kind: BackendKind,
    /// Minimum device tier this backend needs
    pub min_device_tier: DeviceTier,
    /// Relative cost per call (0 = free local inference)
    pub cost_per_call_units: u32,
    /// Whether the backend needs network connectivity
    pub requires_network: bool,
    /// Configured per-call timeout in milliseconds
    pub per_call_timeout_ms: u64,
}

impl BackendDescriptor {
    /// Create a descriptor with kind-appropriate defaults
    #[must_use]
    pub const fn new(id: BackendId, kind: BackendKind) -> Self {
        Self {
            id,
            kind,
            min_device_tier: DeviceTier::Low,
            cost_per_call_units: 0,
            requires_network: matches!(kind, BackendKind::Cloud),
            per_call_timeout_ms: 10_000,
        }
    }

    /// Set the minimum device tier
    #[must_use]
    pub const fn with_min_tier(mut self, tier: DeviceTier) -> Self {
        self.min_device_tier = tier;
        self
    }

    /// Set the relative per-call cost
    #[must_use]
    pub const fn with_cost(mut self, units: u32) -> Self {
        self.cost_per_call_units = units;
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.per_call_timeout_ms = timeout_ms;
        self
    }
}

/// Raw output of a single backend before merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBackendOutput {
    /// Hazards the backend detected
    pub hazards: Vec<Hazard>,
    /// Backend-level confidence in its own output, `[0, 1]`
    pub confidence: f32,
    /// Model identifier the backend ran, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Cooperative cancellation flag passed into every inference call
///
/// Some native inference calls cannot be preempted; backends check the flag
/// between work units and bail out with `AnalysisError::Cancelled`. The
/// engine sets it on timeout and moves on without waiting.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to the in-flight call
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Port for inference backend implementations
///
/// One implementation per platform/runtime, injected at registration time;
/// the engine never dispatches on concrete backend types.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Load weights / establish connections; called once at startup
    async fn initialize(&self) -> Result<(), AnalysisError>;

    /// Run inference on the request's image
    ///
    /// Must observe `cancel` between work units and return promptly once it
    /// is set. All operational failures map into the shared error taxonomy
    /// so the engine treats local and cloud backends uniformly.
    async fn infer(
        &self,
        request: &AnalysisRequest,
        cancel: CancelToken,
    ) -> Result<RawBackendOutput, AnalysisError>;

    /// Lightweight readiness check, never a full inference
    async fn is_available(&self) -> bool;

    /// Release resources (weights, connection pools)
    async fn shutdown(&self) -> Result<(), AnalysisError>;
}

/// Raw hardware readings produced by a platform probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Logical CPU core count
    pub cpu_cores: u32,
    /// Total physical memory in MB
    pub total_memory_mb: u32,
    /// Currently free memory in MB
    pub free_memory_mb: u32,
    /// Whether a dedicated inference accelerator is present
    pub has_accelerator: bool,
    /// Reported thermal state
    pub thermal_state: ThermalState,
    /// Battery charge percent
    pub battery_percent: u8,
    /// Whether OS power saving is active
    pub power_save_enabled: bool,
}

/// Port for platform hardware detection
///
/// The profiler swallows probe errors and falls back to the floor profile;
/// probes should still classify failures for logging.
pub trait DeviceProbe: Send + Sync {
    /// Read current hardware state
    fn read(&self) -> Result<DeviceSnapshot, AnalysisError>;
}

/// Port for the persistence collaborator
///
/// Hand-off is fire-and-forget: storage failure never affects the outcome
/// returned to the caller.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Store the finished outcome (including attempt history) for audit
    async fn store(&self, outcome: &AnalysisOutcome) -> Result<(), AnalysisError>;
}

/// Stage of one request's orchestration, for display purposes only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "backend_id")]
pub enum ProgressStage {
    /// Request accepted, profiling and selection underway
    Initializing,
    /// Named backend is being invoked
    Attempting(BackendId),
    /// A usable (non-degraded) outcome was produced
    Completed,
    /// Every backend failed; safe-default outcome returned
    Degraded,
}

/// Progress event emitted to UI observers
///
/// Consuming (or ignoring) these events has no effect on orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Request the event belongs to
    pub request_id: RequestId,
    /// Current stage
    pub stage: ProgressStage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_id(s: &str) -> BackendId {
        BackendId::new(s).unwrap()
    }

    // === BackendKind Tests ===

    #[test]
    fn locality_classification() {
        assert!(BackendKind::LocalNpu.is_local());
        assert!(BackendKind::LocalGpu.is_local());
        assert!(BackendKind::LocalCpu.is_local());
        assert!(!BackendKind::Cloud.is_local());
    }

    // === BackendDescriptor Tests ===

    #[test]
    fn cloud_descriptor_requires_network_by_default() {
        let desc = BackendDescriptor::new(backend_id("cloud-vision"), BackendKind::Cloud);
        assert!(desc.requires_network);
    }

    #[test]
    fn local_descriptor_does_not_require_network() {
        let desc = BackendDescriptor::new(backend_id("local-npu"), BackendKind::LocalNpu);
        assert!(!desc.requires_network);
    }

    #[test]
    fn descriptor_builders() {
        let desc = BackendDescriptor::new(backend_id("local-gpu"), BackendKind::LocalGpu)
            .with_min_tier(DeviceTier::Mid)
            .with_cost(2)
            .with_timeout_ms(4000);
        assert_eq!(desc.min_device_tier, DeviceTier::Mid);
        assert_eq!(desc.cost_per_call_units, 2);
        assert_eq!(desc.per_call_timeout_ms, 4000);
    }

    // === CancelToken Tests ===

    #[test]
    fn cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
    }

    // === Object Safety ===

    #[test]
    fn backend_trait_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn InferenceBackend>();
        assert_send_sync::<dyn OutcomeSink>();
        assert_send_sync::<dyn DeviceProbe>();
    }
}
