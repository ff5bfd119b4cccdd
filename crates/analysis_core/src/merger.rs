//! Result merging for ensemble analysis
//!
//! Combines the raw outputs of several backends into one hazard list.
//! Hazards match when their labels agree and their regions overlap enough;
//! matched hazards keep the more conservative severity and a
//! reliability-weighted confidence. Unmatched hazards are kept as-is: the
//! merge is a union, a detected hazard is never silently dropped.

use domain::{BackendId, Hazard};
use tracing::debug;

use crate::ports::RawBackendOutput;

/// One backend's output plus its historical reliability weight
#[derive(Debug, Clone)]
pub struct MergeInput {
    /// Backend that produced the output
    pub backend_id: BackendId,
    /// The raw output
    pub output: RawBackendOutput,
    /// Reliability weight, typically the backend's historical success rate
    pub reliability: f64,
}

/// Accumulator for one merged hazard
struct MergedHazard {
    label: String,
    severity: domain::Severity,
    region: Option<domain::BoundingRegion>,
    sources: Vec<BackendId>,
    weighted_confidence: f64,
    weight_sum: f64,
}

impl MergedHazard {
    fn seed(hazard: &Hazard, backend_id: &BackendId, weight: f64) -> Self {
        let mut sources = hazard.sources.clone();
        if !sources.contains(backend_id) {
            sources.push(backend_id.clone());
        }
        Self {
            label: hazard.label.clone(),
            severity: hazard.severity,
            region: hazard.region,
            sources,
            weighted_confidence: f64::from(hazard.confidence) * weight,
            weight_sum: weight,
        }
    }

    fn absorb(&mut self, hazard: &Hazard, backend_id: &BackendId, weight: f64) {
        self.severity = self.severity.most_conservative(hazard.severity);
        // Keep the first localized region seen.
        if self.region.is_none() {
            self.region = hazard.region;
        }
        if !self.sources.contains(backend_id) {
            self.sources.push(backend_id.clone());
        }
        self.weighted_confidence += f64::from(hazard.confidence) * weight;
        self.weight_sum += weight;
    }

    fn matches(&self, hazard: &Hazard, iou_threshold: f32) -> bool {
        if !self.label.eq_ignore_ascii_case(&hazard.label) {
            return false;
        }
        match (self.region, hazard.region) {
            (Some(a), Some(b)) => a.iou(&b) >= iou_threshold,
            // Unlocalized detections match on label alone.
            _ => true,
        }
    }

    fn finalize(self) -> Hazard {
        let confidence = if self.weight_sum > f64::EPSILON {
            (self.weighted_confidence / self.weight_sum) as f32
        } else {
            0.0
        };
        let mut hazard = Hazard::new(self.label, self.severity, confidence);
        hazard.region = self.region;
        hazard.sources = self.sources;
        hazard
    }
}

/// Merges multi-backend outputs into a single hazard set
#[derive(Debug, Clone)]
pub struct ResultMerger {
    iou_threshold: f32,
}

impl ResultMerger {
    /// Create a merger with the given spatial-overlap threshold
    #[must_use]
    pub const fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    /// Merge one or more backend outputs
    ///
    /// Returns the merged hazard list and the aggregate confidence. Merging
    /// a single output returns its hazards unchanged apart from source
    /// attribution (idempotence).
    #[must_use]
    pub fn merge(&self, inputs: &[MergeInput]) -> (Vec<Hazard>, f32) {
        let mut merged: Vec<MergedHazard> = Vec::new();

        for input in inputs {
            // Zero-reliability inputs still contribute hazards (union
            // semantics) with a tiny weight so division stays defined.
            let weight = input.reliability.max(0.01);
            for hazard in &input.output.hazards {
                match merged
                    .iter_mut()
                    .find(|m| m.matches(hazard, self.iou_threshold))
                {
                    Some(existing) => existing.absorb(hazard, &input.backend_id, weight),
                    None => merged.push(MergedHazard::seed(hazard, &input.backend_id, weight)),
                }
            }
        }

        let hazards: Vec<Hazard> = merged.into_iter().map(MergedHazard::finalize).collect();
        let confidence = Self::aggregate_confidence(&hazards, inputs);
        debug!(
            inputs = inputs.len(),
            hazards = hazards.len(),
            confidence,
            "merged backend outputs"
        );
        (hazards, confidence)
    }

    /// Weighted mean of per-hazard confidences; falls back to the
    /// reliability-weighted mean of backend-level confidence when no
    /// hazards were detected.
    fn aggregate_confidence(hazards: &[Hazard], inputs: &[MergeInput]) -> f32 {
        if !hazards.is_empty() {
            let sum: f32 = hazards.iter().map(|h| h.confidence).sum();
            return sum / hazards.len() as f32;
        }
        let weight_sum: f64 = inputs.iter().map(|i| i.reliability.max(0.01)).sum();
        if weight_sum <= f64::EPSILON {
            return 0.0;
        }
        let weighted: f64 = inputs
            .iter()
            .map(|i| f64::from(i.output.confidence) * i.reliability.max(0.01))
            .sum();
        (weighted / weight_sum) as f32
    }
}
