//! Device capability profile

use serde::{Deserialize, Serialize};

/// Coarse capability tier of the running device
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    /// Entry-level hardware, CPU-only inference at best
    #[default]
    Low,
    /// Mid-range hardware, GPU-capable
    Mid,
    /// Flagship hardware with a dedicated accelerator
    High,
}

/// Reported thermal state of the device
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    /// Normal operating temperature
    #[default]
    Nominal,
    /// Slightly elevated, no action needed
    Fair,
    /// Throttling likely, prefer lighter backends
    Serious,
    /// Severe throttling, avoid heavy local inference
    Critical,
}

/// Snapshot of device capability used for backend selection
///
/// Recomputed on a TTL or on thermal-state change; request handling only
/// ever reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Capability tier from the profiler's rule table
    pub tier: DeviceTier,
    /// Current thermal state
    pub thermal_state: ThermalState,
    /// Total physical memory in MB
    pub total_memory_mb: u32,
    /// Currently free memory in MB
    pub free_memory_mb: u32,
    /// Battery charge percent, 0-100
    pub battery_percent: u8,
    /// Whether the OS power saver is active
    pub power_save_enabled: bool,
}

impl DeviceProfile {
    /// The safe fallback profile used when hardware detection fails
    ///
    /// LOW tier and NOMINAL thermal keep selection conservative without
    /// blocking the analyze path.
    #[must_use]
    pub const fn floor() -> Self {
        Self {
            tier: DeviceTier::Low,
            thermal_state: ThermalState::Nominal,
            total_memory_mb: 0,
            free_memory_mb: 0,
            battery_percent: 100,
            power_save_enabled: false,
        }
    }

    /// Whether heavy local inference should be avoided right now
    #[must_use]
    pub fn is_thermally_constrained(&self) -> bool {
        self.thermal_state >= ThermalState::Serious
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::floor()
    }
}
