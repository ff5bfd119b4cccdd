//! Backend selection
//!
//! Ranks and filters registered backends into an ordered fallback chain
//! from the device profile and live health data. Pure reads only; the
//! selector never mutates health state beyond the breaker's own
//! cooldown-elapsed transition inside `is_eligible`.

use domain::{DeviceProfile, ThermalState};
use tracing::debug;

use crate::breaker::HealthBoard;
use crate::config::SelectorWeights;
use crate::ports::BackendDescriptor;
use crate::registry::BackendRegistry;

/// Ranks eligible backends into a fallback chain
#[derive(Debug, Clone)]
pub struct BackendSelector {
    weights: SelectorWeights,
}

impl BackendSelector {
    /// Create a selector with the given ranking weights
    #[must_use]
    pub const fn new(weights: SelectorWeights) -> Self {
        Self { weights }
    }

    /// Build the ordered fallback chain for one request
    ///
    /// Filters out backends the device cannot run (tier, offline network,
    /// open circuit, critical thermal state for accelerator-bound kinds),
    /// ranks the survivors by weighted score, and falls back to the
    /// designated safe-default backend so the chain is never empty.
    #[must_use]
    pub fn select_chain(
        &self,
        profile: &DeviceProfile,
        online: bool,
        registry: &BackendRegistry,
        health: &HealthBoard,
    ) -> Vec<BackendDescriptor> {
        let mut scored: Vec<(f64, BackendDescriptor)> = registry
            .all()
            .into_iter()
            .filter(|desc| desc.min_device_tier <= profile.tier)
            .filter(|desc| online || !desc.requires_network)
            .filter(|desc| {
                // A critically hot device must not spin up accelerator inference.
                profile.thermal_state < ThermalState::Critical || !desc.kind.is_local()
            })
            .filter(|desc| health.is_eligible(&desc.id))
            .map(|desc| (self.score(&desc, health), desc))
            .collect();

        if scored.is_empty() {
            let fallback = registry.safe_default_descriptor();
            debug!(backend = %fallback.id, "no eligible backends, using safe default");
            return vec![fallback];
        }

        // Highest score first; ties break deterministically by id.
        scored.sort_by(|(score_a, desc_a), (score_b, desc_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| desc_a.id.cmp(&desc_b.id))
        });

        let chain: Vec<BackendDescriptor> = scored.into_iter().map(|(_, desc)| desc).collect();
        debug!(
            chain = ?chain.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "selected fallback chain"
        );
        chain
    }

    /// Weighted score over success rate, recent latency, cost, locality
    fn score(&self, descriptor: &BackendDescriptor, health: &HealthBoard) -> f64 {
        let success = health.success_rate(&descriptor.id);
        // No samples yet scores as instant; real latencies decay toward 0.
        let latency = health
            .avg_latency_ms(&descriptor.id)
            .map_or(1.0, |ms| 1.0 / (1.0 + ms / 1000.0));
        let cost = 1.0 / (1.0 + f64::from(descriptor.cost_per_call_units));
        let local = if descriptor.kind.is_local() { 1.0 } else { 0.0 };

        let w = &self.weights;
        w.success_rate * success + w.latency * latency + w.cost * cost + w.local_preference * local
    }
}
