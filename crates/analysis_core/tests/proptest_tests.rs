//! Property-based tests for result merging

use analysis_core::{MergeInput, RawBackendOutput, ResultMerger};
use domain::{BackendId, BoundingRegion, Hazard, Severity};
use proptest::prelude::*;

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn region_strategy() -> impl Strategy<Value = Option<BoundingRegion>> {
    prop_oneof![
        Just(None),
        (0.0f32..0.5, 0.0f32..0.5, 0.5f32..1.0, 0.5f32..1.0)
            .prop_map(|(l, t, r, b)| BoundingRegion::new(l, t, r, b).ok()),
    ]
}

fn hazard_strategy() -> impl Strategy<Value = Hazard> {
    (
        prop_oneof![
            Just("no_hard_hat"),
            Just("fall_hazard"),
            Just("electrical_hazard"),
        ],
        severity_strategy(),
        0.0f32..=1.0,
        region_strategy(),
    )
        .prop_map(|(label, severity, confidence, region)| {
            let mut hazard = Hazard::new(label, severity, confidence);
            hazard.region = region;
            hazard
        })
}

fn inputs_strategy() -> impl Strategy<Value = Vec<MergeInput>> {
    prop::collection::vec(
        (
            prop_oneof![Just("local-npu"), Just("local-gpu"), Just("cloud-vision")],
            prop::collection::vec(hazard_strategy(), 0..4),
            0.0f64..=1.0,
            0.0f32..=1.0,
        )
            .prop_map(|(id, hazards, reliability, confidence)| MergeInput {
                backend_id: BackendId::new(id).unwrap(),
                output: RawBackendOutput {
                    hazards,
                    confidence,
                    model: None,
                },
                reliability,
            }),
        0..4,
    )
}

proptest! {
    #[test]
    fn merge_never_invents_or_silently_drops_labels(inputs in inputs_strategy()) {
        let (merged, _) = ResultMerger::new(0.5).merge(&inputs);

        let total_in: usize = inputs.iter().map(|i| i.output.hazards.len()).sum();
        prop_assert!(merged.len() <= total_in);

        // Union semantics: every detected label survives the merge.
        for input in &inputs {
            for hazard in &input.output.hazards {
                prop_assert!(
                    merged.iter().any(|m| m.label.eq_ignore_ascii_case(&hazard.label)),
                    "label {} lost in merge", hazard.label
                );
            }
        }
    }

    #[test]
    fn merged_confidence_stays_in_unit_range(inputs in inputs_strategy()) {
        let (merged, confidence) = ResultMerger::new(0.5).merge(&inputs);
        prop_assert!((0.0..=1.0).contains(&confidence));
        for hazard in &merged {
            prop_assert!((0.0..=1.0).contains(&hazard.confidence));
        }
    }

    #[test]
    fn merged_severity_never_below_any_contributor(inputs in inputs_strategy()) {
        let (merged, _) = ResultMerger::new(0.5).merge(&inputs);
        for input in &inputs {
            for hazard in &input.output.hazards {
                let max_merged = merged
                    .iter()
                    .filter(|m| m.label.eq_ignore_ascii_case(&hazard.label))
                    .map(|m| m.severity)
                    .max();
                // The hazard's group exists (union) and its severity is
                // at least as conservative as this contribution.
                prop_assert!(max_merged.is_some_and(|s| s >= hazard.severity));
            }
        }
    }

    #[test]
    fn single_input_merge_is_idempotent(
        hazards in prop::collection::vec(hazard_strategy(), 0..5),
        reliability in 0.0f64..=1.0,
    ) {
        let input = MergeInput {
            backend_id: BackendId::new("local-npu").unwrap(),
            output: RawBackendOutput { hazards: hazards.clone(), confidence: 0.8, model: None },
            reliability,
        };
        let (merged, _) = ResultMerger::new(0.5).merge(&[input]);

        // Distinct-by-match hazards pass through; identical detections may
        // still collapse, so the bound is an upper one.
        prop_assert!(merged.len() <= hazards.len());
        for hazard in &hazards {
            let counterpart = merged
                .iter()
                .find(|m| m.label.eq_ignore_ascii_case(&hazard.label))
                .unwrap();
            prop_assert!(counterpart.severity >= hazard.severity);
        }
    }
}
