//! Detected hazard entity

use serde::{Deserialize, Serialize};

use crate::value_objects::{BackendId, BoundingRegion, Severity};

/// A single hazard detected in a captured image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Detection label, e.g. "missing_hard_hat" or "fall_hazard"
    pub label: String,
    /// How dangerous the condition is
    pub severity: Severity,
    /// Detection confidence in `[0, 1]`
    pub confidence: f32,
    /// Where in the image the hazard was found, if the backend localizes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<BoundingRegion>,
    /// Backends that reported (or corroborated) this hazard
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<BackendId>,
}

impl Hazard {
    /// Create a hazard, clamping confidence into `[0, 1]`
    #[must_use]
    pub fn new(label: impl Into<String>, severity: Severity, confidence: f32) -> Self {
        Self {
            label: label.into(),
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            region: None,
            sources: Vec::new(),
        }
    }

    /// Attach a bounding region
    #[must_use]
    pub fn with_region(mut self, region: BoundingRegion) -> Self {
        self.region = Some(region);
        self
    }

    /// Attach the reporting backend
    #[must_use]
    pub fn with_source(mut self, source: BackendId) -> Self {
        self.sources.push(source);
        self
    }

    /// Whether two hazards refer to the same condition by label
    ///
    /// Labels compare case-insensitively; spatial matching is layered on
    /// top by the result merger.
    #[must_use]
    pub fn same_label(&self, other: &Self) -> bool {
        self.label.eq_ignore_ascii_case(&other.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        assert!((Hazard::new("x", Severity::Low, 1.7).confidence - 1.0).abs() < f32::EPSILON);
        assert!(Hazard::new("x", Severity::Low, -0.3).confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let a = Hazard::new("Fall_Hazard", Severity::High, 0.9);
        let b = Hazard::new("fall_hazard", Severity::Medium, 0.7);
        assert!(a.same_label(&b));
    }

    #[test]
    fn region_and_source_builders() {
        let region = BoundingRegion::new(0.1, 0.1, 0.4, 0.4).unwrap();
        let source = BackendId::new("local-npu").unwrap();
        let hazard = Hazard::new("no_safety_vest", Severity::Medium, 0.8)
            .with_region(region)
            .with_source(source.clone());
        assert_eq!(hazard.region, Some(region));
        assert_eq!(hazard.sources, vec![source]);
    }
}
