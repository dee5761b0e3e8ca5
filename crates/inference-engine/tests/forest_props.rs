use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use inference_engine::{ModelHandle, RiskLabel};
use proptest::prelude::*;

const MODEL_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/risk_forest.json");

fn any_feature() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e6f64..1.0e6,
        0.0f64..300.0,
        Just(0.0),
        Just(f64::MAX),
        Just(f64::MIN),
    ]
}

proptest! {
    #[test]
    fn bundled_forest_output_is_well_formed(
        values in proptest::array::uniform7(any_feature()),
    ) {
        prop_assert_eq!(values.len(), FEATURE_DIMENSION);
        let handle = ModelHandle::load(MODEL_PATH);
        let result = handle.classify(&FeatureVector::from_values(values)).unwrap();

        let total: f64 = result.probabilities.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9, "probabilities sum to {}", total);
        prop_assert!(result.probabilities.iter().all(|p| *p >= 0.0 && *p <= 1.0 + 1e-9));
        prop_assert!((0.0..=1.0).contains(&result.score));
        prop_assert!(matches!(
            result.label,
            RiskLabel::Low | RiskLabel::Moderate | RiskLabel::High | RiskLabel::Unknown
        ));

        let best = result.probabilities.iter().copied().fold(f64::MIN, f64::max);
        prop_assert!((result.score - best.min(1.0)).abs() < 1e-12);
        prop_assert_eq!(result.probabilities[result.class_index as usize], best);
    }
}
