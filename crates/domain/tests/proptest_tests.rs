//! Property-based tests for domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::value_objects::{BoundingRegion, RiskLevel, Severity};
use proptest::prelude::*;

// ============================================================================
// BoundingRegion Property Tests
// ============================================================================

mod bounding_region_tests {
    use super::*;

    fn arb_region() -> impl Strategy<Value = BoundingRegion> {
        (0.0f32..0.9, 0.0f32..0.9).prop_flat_map(|(left, top)| {
            ((left + 0.05)..=1.0f32, (top + 0.05)..=1.0f32).prop_map(move |(right, bottom)| {
                BoundingRegion::new(left, top, right, bottom).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn iou_is_symmetric(a in arb_region(), b in arb_region()) {
            prop_assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-5);
        }

        #[test]
        fn iou_is_bounded(a in arb_region(), b in arb_region()) {
            let iou = a.iou(&b);
            prop_assert!((0.0..=1.0 + 1e-5).contains(&iou));
        }

        #[test]
        fn iou_with_self_is_one(a in arb_region()) {
            prop_assert!((a.iou(&a) - 1.0).abs() < 1e-4);
        }

        #[test]
        fn intersection_never_exceeds_smaller_area(a in arb_region(), b in arb_region()) {
            let inter = a.intersection_area(&b);
            prop_assert!(inter <= a.area() + 1e-6);
            prop_assert!(inter <= b.area() + 1e-6);
        }

        #[test]
        fn area_is_positive(a in arb_region()) {
            prop_assert!(a.area() > 0.0);
        }
    }
}

// ============================================================================
// Severity Property Tests
// ============================================================================

mod severity_tests {
    use super::*;

    fn arb_severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Low),
            Just(Severity::Medium),
            Just(Severity::High),
            Just(Severity::Critical),
        ]
    }

    proptest! {
        #[test]
        fn most_conservative_is_commutative(a in arb_severity(), b in arb_severity()) {
            prop_assert_eq!(a.most_conservative(b), b.most_conservative(a));
        }

        #[test]
        fn most_conservative_never_lowers(a in arb_severity(), b in arb_severity()) {
            let merged = a.most_conservative(b);
            prop_assert!(merged >= a);
            prop_assert!(merged >= b);
        }

        #[test]
        fn rank_agrees_with_ordering(a in arb_severity(), b in arb_severity()) {
            prop_assert_eq!(a.rank().cmp(&b.rank()), a.cmp(&b));
        }

        #[test]
        fn risk_level_is_monotone(a in arb_severity(), b in arb_severity()) {
            if a <= b {
                prop_assert!(RiskLevel::from(a) <= RiskLevel::from(b));
            }
        }
    }
}
