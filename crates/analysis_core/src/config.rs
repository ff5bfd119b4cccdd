//! Configuration for the orchestration engine

use domain::DeviceTier;
use serde::{Deserialize, Serialize};

/// Circuit breaker configuration, one policy shared by all backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before a backend's circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Base cooldown before an open circuit admits a probe, in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Cooldown multiplier applied on each re-open from half-open
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on the backed-off cooldown, in milliseconds
    #[serde(default = "default_max_cooldown_ms")]
    pub max_cooldown_ms: u64,
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_cooldown_ms() -> u64 {
    30_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_max_cooldown_ms() -> u64 {
    300_000
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_cooldown_ms: default_max_cooldown_ms(),
        }
    }
}

impl BreakerConfig {
    /// Effective cooldown after `reopen_count` consecutive re-opens
    #[must_use]
    pub fn cooldown_after_reopens(&self, reopen_count: u32) -> u64 {
        let factor = self.backoff_multiplier.powi(reopen_count.min(16) as i32);
        let backed_off = (self.cooldown_ms as f64 * factor) as u64;
        backed_off.min(self.max_cooldown_ms)
    }
}

/// Weights for the backend selector's ranking score
///
/// All component scores are normalized into `[0, 1]` before weighting, so
/// the weights express relative importance directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorWeights {
    /// Weight of historical success rate
    #[serde(default = "default_success_weight")]
    pub success_rate: f64,

    /// Weight of inverse recent latency
    #[serde(default = "default_latency_weight")]
    pub latency: f64,

    /// Weight of inverse per-call cost
    #[serde(default = "default_cost_weight")]
    pub cost: f64,

    /// Bonus weight applied to local backends (bandwidth, latency, cost)
    #[serde(default = "default_local_preference")]
    pub local_preference: f64,
}

const fn default_success_weight() -> f64 {
    0.5
}

const fn default_latency_weight() -> f64 {
    0.3
}

const fn default_cost_weight() -> f64 {
    0.15
}

const fn default_local_preference() -> f64 {
    0.05
}

impl Default for SelectorWeights {
    fn default() -> Self {
        Self {
            success_rate: default_success_weight(),
            latency: default_latency_weight(),
            cost: default_cost_weight(),
            local_preference: default_local_preference(),
        }
    }
}

/// Tier assignment rule table for the device profiler
///
/// Thresholds are configuration, not hardcoded in the profiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum CPU cores for the HIGH tier
    #[serde(default = "default_high_min_cores")]
    pub high_min_cores: u32,

    /// Minimum total memory (MB) for the HIGH tier
    #[serde(default = "default_high_min_memory_mb")]
    pub high_min_memory_mb: u32,

    /// Whether HIGH additionally requires a dedicated accelerator
    #[serde(default = "default_true")]
    pub high_requires_accelerator: bool,

    /// Minimum CPU cores for the MID tier
    #[serde(default = "default_mid_min_cores")]
    pub mid_min_cores: u32,

    /// Minimum total memory (MB) for the MID tier
    #[serde(default = "default_mid_min_memory_mb")]
    pub mid_min_memory_mb: u32,

    /// How long a cached profile stays fresh, in milliseconds
    #[serde(default = "default_profile_ttl_ms")]
    pub profile_ttl_ms: u64,
}

const fn default_high_min_cores() -> u32 {
    8
}

const fn default_high_min_memory_mb() -> u32 {
    6144
}

const fn default_true() -> bool {
    true
}

const fn default_mid_min_cores() -> u32 {
    4
}

const fn default_mid_min_memory_mb() -> u32 {
    3072
}

const fn default_profile_ttl_ms() -> u64 {
    60_000
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high_min_cores: default_high_min_cores(),
            high_min_memory_mb: default_high_min_memory_mb(),
            high_requires_accelerator: default_true(),
            mid_min_cores: default_mid_min_cores(),
            mid_min_memory_mb: default_mid_min_memory_mb(),
            profile_ttl_ms: default_profile_ttl_ms(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Circuit breaker policy
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Selector ranking weights
    #[serde(default)]
    pub selector: SelectorWeights,

    /// Profiler tier rule table
    #[serde(default)]
    pub tiers: TierThresholds,

    /// Spatial-overlap threshold for hazard merging
    #[serde(default = "default_iou_threshold")]
    pub merge_iou_threshold: f32,

    /// Capacity of the recent-request telemetry ring
    #[serde(default = "default_recent_requests")]
    pub recent_requests_capacity: usize,
}

const fn default_iou_threshold() -> f32 {
    0.5
}

const fn default_recent_requests() -> usize {
    32
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            selector: SelectorWeights::default(),
            tiers: TierThresholds::default(),
            merge_iou_threshold: default_iou_threshold(),
            recent_requests_capacity: default_recent_requests(),
        }
    }
}

/// Concurrent local inference slots permitted for a device tier
///
/// Bounds simultaneous heavy on-device inference so ensemble mode cannot
/// OOM a constrained phone.
#[must_use]
pub const fn local_inference_slots(tier: DeviceTier) -> usize {
    match tier {
        DeviceTier::Low => 1,
        DeviceTier::Mid => 2,
        DeviceTier::High => 3,
    }
}
