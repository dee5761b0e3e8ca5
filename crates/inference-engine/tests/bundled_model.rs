use feature_engine::FeatureVector;
use inference_engine::{ModelHandle, RiskLabel};

const MODEL_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/risk_forest.json");

fn vector(age: f64, systolic_bp: f64, aqi: f64, pm25: f64) -> FeatureVector {
    FeatureVector::from_values([age, 80.0, systolic_bp, 0.0, 0.0, aqi, pm25])
}

#[test]
fn bundled_model_loads() {
    let handle = ModelHandle::load(MODEL_PATH);
    assert!(handle.is_loaded(), "{:?}", handle.unavailable_reason());
}

#[test]
fn clean_air_normal_pressure_is_low() {
    let handle = ModelHandle::load(MODEL_PATH);
    let result = handle.classify(&vector(45.0, 110.0, 50.0, 20.0)).unwrap();

    assert_eq!(result.label, RiskLabel::Low);
    assert!((result.score - 2.39 / 3.0).abs() < 1e-9);
}

#[test]
fn elevated_pressure_is_moderate() {
    let handle = ModelHandle::load(MODEL_PATH);
    let result = handle.classify(&vector(50.0, 130.0, 120.0, 40.0)).unwrap();

    assert_eq!(result.label, RiskLabel::Moderate);
    assert!((result.score - 0.71).abs() < 1e-9);
}

#[test]
fn polluted_air_and_hypertension_is_high() {
    let handle = ModelHandle::load(MODEL_PATH);
    let result = handle.classify(&vector(60.0, 160.0, 180.0, 90.0)).unwrap();

    assert_eq!(result.label, RiskLabel::High);
    assert!(result.score > 0.9);
    assert!(result.score <= 1.0);
}

#[test]
fn probabilities_sum_to_one() {
    let handle = ModelHandle::load(MODEL_PATH);
    for v in [
        vector(30.0, 0.0, 0.0, 0.0),
        vector(70.0, 135.0, 155.0, 60.0),
        vector(999.0, 300.0, 500.0, 250.0),
    ] {
        let result = handle.classify(&v).unwrap();
        let total: f64 = result.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
