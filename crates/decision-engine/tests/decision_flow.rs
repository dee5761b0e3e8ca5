//! End-to-end decision behaviour against the in-memory store.

use alerting::AlertPolicy;
use decision_engine::{DecisionEngine, ErrorKind};
use feature_engine::{FeatureVector, HealthInputs};
use inference_engine::{InferenceError, ModelHandle, RiskLabel, RiskModel};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use storage::{NewAqiRecord, Repository};

/// Returns the same class and confidence for every input
struct StubModel {
    class: i64,
    score: f64,
}

impl RiskModel for StubModel {
    fn predict_class(&self, _features: &FeatureVector) -> Result<i64, InferenceError> {
        Ok(self.class)
    }

    fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        let rest = (1.0 - self.score) / 2.0;
        let mut probabilities = vec![rest; 3];
        if let Some(slot) = probabilities.get_mut(self.class as usize) {
            *slot = self.score;
        }
        Ok(probabilities)
    }

    fn describe(&self) -> String {
        format!("stub(class={}, score={})", self.class, self.score)
    }
}

fn engine_with(model: ModelHandle) -> (DecisionEngine, Arc<Repository>) {
    let repository = Arc::new(Repository::new());
    let engine = DecisionEngine::new(
        Arc::new(model),
        AlertPolicy::default(),
        Arc::clone(&repository),
    );
    (engine, repository)
}

fn stub(class: i64, score: f64) -> ModelHandle {
    ModelHandle::from_model(StubModel { class, score })
}

async fn seed_aqi(repository: &Repository, aqi_value: i64, pm25: f64) -> i64 {
    repository
        .insert_aqi(NewAqiRecord {
            city: "Delhi".to_string(),
            aqi_value,
            pm25,
            pm10: 0.0,
            co: 0.0,
            no2: 0.0,
            o3: 0.0,
        })
        .await
        .unwrap()
        .aqi_id
}

fn vitals(systolic_bp: Value) -> HealthInputs {
    serde_json::from_value(json!({
        "age": 52,
        "heart_rate": 88,
        "systolic_bp": systolic_bp,
        "smoking_status": 1,
        "existing_conditions": 0
    }))
    .unwrap()
}

#[tokio::test]
async fn environmental_trigger_uses_label_for_severity() {
    for (class, expected) in [(2, "High"), (1, "Moderate"), (0, "Moderate")] {
        let (engine, repository) = engine_with(stub(class, 0.5));
        let aqi_id = seed_aqi(&repository, 160, 80.0).await;

        let result = engine.decide(4, aqi_id, &vitals(json!(145))).await.unwrap();
        assert!(result.alert_triggered);

        let alerts = repository.alerts_for_user(4, None, 10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert.severity, expected);
        assert_eq!(alerts[0].alert.prediction_id, result.prediction_id);
    }
}

#[tokio::test]
async fn high_confidence_is_emergency_for_any_label() {
    for class in [0, 1, 2] {
        let (engine, repository) = engine_with(stub(class, 0.95));
        let aqi_id = seed_aqi(&repository, 40, 10.0).await;

        let result = engine.decide(8, aqi_id, &vitals(json!(110))).await.unwrap();
        assert!(result.alert_triggered);
        assert_eq!(result.risk_score, 0.95);

        let alerts = repository.alerts_for_user(8, None, 10).await.unwrap();
        assert_eq!(alerts[0].alert.severity, "Emergency");
        assert!(alerts[0].alert.message.contains("AQI is 40"));
        assert!(alerts[0].alert.message.contains("Systolic BP is 110"));
    }
}

#[tokio::test]
async fn quiet_decision_writes_only_a_prediction() {
    let (engine, repository) = engine_with(stub(0, 0.6));
    let aqi_id = seed_aqi(&repository, 90, 30.0).await;

    let result = engine.decide(2, aqi_id, &vitals(json!(150))).await.unwrap();

    assert_eq!(result.risk_label, RiskLabel::Low);
    assert!(!result.alert_triggered);
    assert_eq!(repository.prediction_count().await.unwrap(), 1);
    assert_eq!(repository.alert_count().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_aqi_is_not_found_without_writes() {
    let (engine, repository) = engine_with(stub(2, 0.99));

    let err = engine.decide(1, 777, &vitals(json!(150))).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(repository.prediction_count().await.unwrap(), 0);
    assert_eq!(repository.alert_count().await.unwrap(), 0);
}

#[tokio::test]
async fn unavailable_model_never_persists() {
    let (engine, repository) = engine_with(ModelHandle::unavailable("artifact missing"));
    let aqi_id = seed_aqi(&repository, 200, 120.0).await;

    for _ in 0..3 {
        let err = engine.decide(1, aqi_id, &vitals(json!(170))).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    // checked before the AQI lookup
    let err = engine.decide(1, 999, &vitals(json!(170))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);

    assert_eq!(repository.prediction_count().await.unwrap(), 0);
    assert_eq!(repository.alert_count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_field_is_validation_error() {
    let (engine, repository) = engine_with(stub(1, 0.5));
    let aqi_id = seed_aqi(&repository, 100, 40.0).await;

    let inputs: HealthInputs = serde_json::from_value(json!({
        "age": 40,
        "systolic_bp": 120,
        "smoking_status": 0,
        "existing_conditions": 0
    }))
    .unwrap();

    let err = engine.decide(1, aqi_id, &inputs).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "heart_rate is required");
    assert_eq!(repository.prediction_count().await.unwrap(), 0);
}

#[tokio::test]
async fn null_and_garbage_vitals_are_defaulted() {
    let (engine, repository) = engine_with(stub(1, 0.5));
    let aqi_id = seed_aqi(&repository, 100, 40.0).await;

    let inputs: HealthInputs = serde_json::from_value(json!({
        "age": null,
        "heart_rate": "",
        "systolic_bp": " 130 ",
        "smoking_status": "yes",
        "existing_conditions": null
    }))
    .unwrap();

    let result = engine.decide(1, aqi_id, &inputs).await.unwrap();
    assert_eq!(result.risk_label, RiskLabel::Moderate);
    assert_eq!(repository.prediction_count().await.unwrap(), 1);
}

#[tokio::test]
async fn unparseable_systolic_bp_is_rejected_before_writing() {
    let (engine, repository) = engine_with(stub(1, 0.5));
    let aqi_id = seed_aqi(&repository, 100, 40.0).await;

    for raw in [json!("high"), json!(null), json!([140])] {
        let err = engine.decide(1, aqi_id, &vitals(raw)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert_eq!(repository.prediction_count().await.unwrap(), 0);
}

#[tokio::test]
async fn non_finite_pm25_is_a_storage_error() {
    let (engine, repository) = engine_with(stub(1, 0.5));
    let aqi_id = seed_aqi(&repository, 100, f64::NAN).await;

    let err = engine.decide(1, aqi_id, &vitals(json!(120))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(repository.prediction_count().await.unwrap(), 0);
}

#[tokio::test]
async fn identical_requests_create_distinct_predictions() {
    let (engine, repository) = engine_with(stub(2, 0.8));
    let aqi_id = seed_aqi(&repository, 160, 70.0).await;
    let inputs = vitals(json!(150));

    let first = engine.decide(3, aqi_id, &inputs).await.unwrap();
    let second = engine.decide(3, aqi_id, &inputs).await.unwrap();

    assert_ne!(first.prediction_id, second.prediction_id);
    assert_eq!(repository.prediction_count().await.unwrap(), 2);
    assert_eq!(repository.alert_count().await.unwrap(), 2);

    let predictions = repository.predictions_for_user(3, 10).await.unwrap();
    for alert in repository.alerts_for_user(3, None, 10).await.unwrap() {
        assert!(predictions
            .iter()
            .any(|p| p.prediction_id == alert.alert.prediction_id && p.alert_triggered));
    }
}

#[tokio::test]
async fn score_is_rounded_in_response_only() {
    let (engine, repository) = engine_with(stub(1, 0.612345));
    let aqi_id = seed_aqi(&repository, 60, 20.0).await;

    let result = engine.decide(6, aqi_id, &vitals(json!(120))).await.unwrap();
    assert_eq!(result.risk_score, 0.6123);

    let stored = repository.predictions_for_user(6, 1).await.unwrap();
    assert_eq!(stored[0].risk_score, 0.612345);
}

#[tokio::test]
async fn bundled_forest_escalates_severe_case() {
    let model = ModelHandle::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../models/risk_forest.json"
    ));
    assert!(model.is_loaded());
    let (engine, repository) = engine_with(model);
    let aqi_id = seed_aqi(&repository, 180, 90.0).await;

    let inputs: HealthInputs = serde_json::from_value(json!({
        "age": 60,
        "heart_rate": 80,
        "systolic_bp": 160,
        "smoking_status": 1,
        "existing_conditions": 1
    }))
    .unwrap();

    let result = engine.decide(10, aqi_id, &inputs).await.unwrap();
    assert_eq!(result.risk_label, RiskLabel::High);
    assert!(result.alert_triggered);
    assert!((0.0..=1.0).contains(&result.risk_score));

    let alerts = repository.alerts_for_user(10, None, 10).await.unwrap();
    assert_eq!(alerts[0].alert.severity, "Emergency");
}

proptest! {
    #[test]
    fn alert_fires_iff_either_trigger(
        class in 0i64..3,
        score in 0.34f64..1.0,
        aqi_value in 0i64..400,
        systolic_bp in 80i64..200,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let (engine, repository) = engine_with(stub(class, score));
            let aqi_id = seed_aqi(&repository, aqi_value, 35.0).await;

            let result = engine
                .decide(1, aqi_id, &vitals(json!(systolic_bp)))
                .await
                .unwrap();

            let expected = (aqi_value > 150 && systolic_bp > 140) || score > 0.75;
            prop_assert_eq!(result.alert_triggered, expected);
            prop_assert_eq!(repository.prediction_count().await.unwrap(), 1);
            prop_assert_eq!(
                repository.alert_count().await.unwrap(),
                usize::from(expected)
            );
            Ok(())
        })?;
    }
}
