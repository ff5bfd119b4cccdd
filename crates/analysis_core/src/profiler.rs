//! Device capability profiler
//!
//! Produces the `DeviceProfile` the selector ranks against. Never fails and
//! never blocks the analyze path: hardware detection errors fall back to
//! the floor profile (LOW tier, NOMINAL thermal), and results are cached
//! with a TTL plus event-driven invalidation for thermal callbacks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::{DeviceProfile, DeviceTier};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::TierThresholds;
use crate::ports::{DeviceProbe, DeviceSnapshot};

#[derive(Debug, Clone, Copy)]
struct CachedProfile {
    profile: DeviceProfile,
    refreshed_at: Instant,
}

/// TTL-cached device profiler over a platform probe
pub struct DeviceCapabilityProfiler {
    probe: Arc<dyn DeviceProbe>,
    thresholds: TierThresholds,
    cache: RwLock<Option<CachedProfile>>,
}

impl std::fmt::Debug for DeviceCapabilityProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCapabilityProfiler")
            .field("thresholds", &self.thresholds)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl DeviceCapabilityProfiler {
    /// Create a profiler over the given platform probe
    #[must_use]
    pub fn new(probe: Arc<dyn DeviceProbe>, thresholds: TierThresholds) -> Self {
        Self {
            probe,
            thresholds,
            cache: RwLock::new(None),
        }
    }

    /// Current device profile; always returns, stale or floor if needed
    #[must_use]
    pub fn profile(&self) -> DeviceProfile {
        let ttl = Duration::from_millis(self.thresholds.profile_ttl_ms);
        if let Some(cached) = *self.cache.read()
            && cached.refreshed_at.elapsed() < ttl
        {
            return cached.profile;
        }
        self.refresh()
    }

    /// Drop the cached profile; next read re-probes
    ///
    /// Wired to platform thermal-state-change notifications.
    pub fn invalidate(&self) {
        debug!("device profile cache invalidated");
        *self.cache.write() = None;
    }

    fn refresh(&self) -> DeviceProfile {
        let profile = match self.probe.read() {
            Ok(snapshot) => self.classify(&snapshot),
            Err(err) => {
                warn!(error = %err, "device probe failed, using floor profile");
                DeviceProfile::floor()
            }
        };
        *self.cache.write() = Some(CachedProfile {
            profile,
            refreshed_at: Instant::now(),
        });
        debug!(tier = ?profile.tier, thermal = ?profile.thermal_state, "device profile refreshed");
        profile
    }

    /// Apply the configured tier rule table to raw readings
    fn classify(&self, snapshot: &DeviceSnapshot) -> DeviceProfile {
        let t = &self.thresholds;
        let tier = if snapshot.cpu_cores >= t.high_min_cores
            && snapshot.total_memory_mb >= t.high_min_memory_mb
            && (!t.high_requires_accelerator || snapshot.has_accelerator)
        {
            DeviceTier::High
        } else if snapshot.cpu_cores >= t.mid_min_cores
            && snapshot.total_memory_mb >= t.mid_min_memory_mb
        {
            DeviceTier::Mid
        } else {
            DeviceTier::Low
        };

        DeviceProfile {
            tier,
            thermal_state: snapshot.thermal_state,
            total_memory_mb: snapshot.total_memory_mb,
            free_memory_mb: snapshot.free_memory_mb,
            battery_percent: snapshot.battery_percent,
            power_save_enabled: snapshot.power_save_enabled,
        }
    }
}
