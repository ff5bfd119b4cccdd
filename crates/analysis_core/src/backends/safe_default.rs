//! Safe-default backend
//!
//! The designated minimal-capability backend the selector falls back to
//! when filtering leaves no candidates. It runs no model: it returns
//! generic, low-confidence PPE and work-type reminders so the caller
//! always gets a structurally valid analysis.

use async_trait::async_trait;
use domain::{AnalysisRequest, BackendId, DeviceTier, Hazard, Severity, WorkType};

use crate::error::AnalysisError;
use crate::ports::{
    BackendDescriptor, BackendKind, CancelToken, InferenceBackend, RawBackendOutput,
};

/// Confidence attached to checklist reminders; deliberately low so merged
/// results from real models dominate.
const CHECKLIST_CONFIDENCE: f32 = 0.2;

/// Always-available checklist backend
#[derive(Debug, Default, Clone, Copy)]
pub struct SafeDefaultBackend;

impl SafeDefaultBackend {
    /// Well-known id of the safe-default backend
    pub fn id() -> BackendId {
        // The literal is valid by construction.
        BackendId::new("safety-checklist").unwrap_or_else(|_| unreachable!())
    }

    /// Descriptor for registration: LOW tier, free, offline-capable
    #[must_use]
    pub fn descriptor() -> BackendDescriptor {
        BackendDescriptor::new(Self::id(), BackendKind::LocalCpu)
            .with_min_tier(DeviceTier::Low)
            .with_cost(0)
            .with_timeout_ms(1000)
    }

    /// Generic reminders for a work type, from the baseline site checklist
    fn reminders(work_type: WorkType) -> Vec<Hazard> {
        let labels: &[(&str, Severity)] = match work_type {
            WorkType::GeneralConstruction => &[("ppe_check", Severity::Low)],
            WorkType::Electrical => &[
                ("lockout_tagout_check", Severity::Medium),
                ("ppe_check", Severity::Low),
            ],
            WorkType::Roofing => &[
                ("fall_protection_check", Severity::Medium),
                ("ppe_check", Severity::Low),
            ],
            WorkType::Excavation => &[
                ("trench_protection_check", Severity::Medium),
                ("ppe_check", Severity::Low),
            ],
            WorkType::Steelwork => &[
                ("fall_protection_check", Severity::Medium),
                ("rigging_check", Severity::Medium),
            ],
            WorkType::Concrete => &[
                ("silica_dust_check", Severity::Medium),
                ("ppe_check", Severity::Low),
            ],
        };
        labels
            .iter()
            .map(|(label, severity)| {
                Hazard::new(*label, *severity, CHECKLIST_CONFIDENCE).with_source(Self::id())
            })
            .collect()
    }
}

#[async_trait]
impl InferenceBackend for SafeDefaultBackend {
    async fn initialize(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn infer(
        &self,
        request: &AnalysisRequest,
        _cancel: CancelToken,
    ) -> Result<RawBackendOutput, AnalysisError> {
        Ok(RawBackendOutput {
            hazards: Self::reminders(request.work_type),
            confidence: CHECKLIST_CONFIDENCE,
            model: Some("baseline-checklist".to_string()),
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn shutdown(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(work_type: WorkType) -> AnalysisRequest {
        AnalysisRequest::new(vec![0u8; 16], 640, 480, work_type, 1000)
    }

    #[tokio::test]
    async fn never_fails_and_always_available() {
        let backend = SafeDefaultBackend;
        assert!(backend.initialize().await.is_ok());
        assert!(backend.is_available().await);
        let output = backend
            .infer(&request(WorkType::GeneralConstruction), CancelToken::new())
            .await
            .unwrap();
        assert!(!output.hazards.is_empty());
    }

    #[tokio::test]
    async fn reminders_are_work_type_specific() {
        let backend = SafeDefaultBackend;
        let roofing = backend
            .infer(&request(WorkType::Roofing), CancelToken::new())
            .await
            .unwrap();
        assert!(
            roofing
                .hazards
                .iter()
                .any(|h| h.label == "fall_protection_check")
        );

        let excavation = backend
            .infer(&request(WorkType::Excavation), CancelToken::new())
            .await
            .unwrap();
        assert!(
            excavation
                .hazards
                .iter()
                .any(|h| h.label == "trench_protection_check")
        );
    }

    #[tokio::test]
    async fn reminders_carry_low_confidence() {
        let backend = SafeDefaultBackend;
        let output = backend
            .infer(&request(WorkType::Concrete), CancelToken::new())
            .await
            .unwrap();
        assert!(output.hazards.iter().all(|h| h.confidence <= 0.5));
    }

    #[test]
    fn descriptor_is_low_tier_and_offline() {
        let desc = SafeDefaultBackend::descriptor();
        assert_eq!(desc.min_device_tier, DeviceTier::Low);
        assert!(!desc.requires_network);
        assert_eq!(desc.cost_per_call_units, 0);
    }
}
