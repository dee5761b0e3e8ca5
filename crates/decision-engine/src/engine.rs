//! Decision Engine Implementation

use crate::error::EngineError;
use alerting::AlertPolicy;
use feature_engine::{parse_int, AqiReading, FeatureAssembler, HealthInputs};
use inference_engine::{ModelHandle, RiskLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use storage::{NewAlert, NewPrediction, Repository};
use tracing::{debug, error, info, warn};

/// Progress of one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStage {
    Started,
    FeaturesAssembled,
    Classified,
    PolicyEvaluated,
    PredictionPersisted,
    AlertPersisted,
    NoAlert,
    Completed,
}

impl fmt::Display for DecisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionStage::Started => "started",
            DecisionStage::FeaturesAssembled => "features_assembled",
            DecisionStage::Classified => "classified",
            DecisionStage::PolicyEvaluated => "policy_evaluated",
            DecisionStage::PredictionPersisted => "prediction_persisted",
            DecisionStage::AlertPersisted => "alert_persisted",
            DecisionStage::NoAlert => "no_alert",
            DecisionStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// What the caller gets back; the alert itself is not echoed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub prediction_id: i64,
    pub risk_label: RiskLabel,
    /// Rounded to 4 decimals; the stored score keeps full precision
    pub risk_score: f64,
    pub alert_triggered: bool,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Request-scoped orchestration of assembler, classifier, policy and store.
///
/// Holds no mutable state. The model handle is shared read-only across
/// requests; a decision either writes one prediction (plus at most one alert
/// referencing it) or writes nothing.
pub struct DecisionEngine {
    model: Arc<ModelHandle>,
    assembler: FeatureAssembler,
    policy: AlertPolicy,
    repository: Arc<Repository>,
}

impl DecisionEngine {
    /// Create a new decision engine
    pub fn new(model: Arc<ModelHandle>, policy: AlertPolicy, repository: Arc<Repository>) -> Self {
        info!(
            "Creating decision engine (model loaded: {}, storage: {})",
            model.is_loaded(),
            repository.backend_name()
        );
        Self {
            model,
            assembler: FeatureAssembler::new(),
            policy,
            repository,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Run one risk decision for `user_id` against AQI record `aqi_id`
    pub async fn decide(
        &self,
        user_id: i64,
        aqi_id: i64,
        inputs: &HealthInputs,
    ) -> Result<DecisionResult, EngineError> {
        let result = self.run(user_id, aqi_id, inputs).await;

        match &result {
            Ok(decision) => {
                metrics::counter!("risk_decisions_total", "label" => decision.risk_label.as_str())
                    .increment(1);
            }
            Err(e) => {
                let kind = e.kind();
                metrics::counter!("risk_decision_failures_total", "kind" => kind.as_str())
                    .increment(1);
                match e {
                    EngineError::Storage(_) => {
                        error!("Decision for user {} failed ({}): {}", user_id, kind, e)
                    }
                    _ => warn!("Decision for user {} rejected ({}): {}", user_id, kind, e),
                }
            }
        }

        result
    }

    async fn run(
        &self,
        user_id: i64,
        aqi_id: i64,
        inputs: &HealthInputs,
    ) -> Result<DecisionResult, EngineError> {
        self.stage(user_id, DecisionStage::Started);
        inputs.ensure_present()?;
        self.model.ensure_available()?;

        let aqi = self
            .repository
            .get_aqi(aqi_id)
            .await?
            .ok_or(EngineError::AqiNotFound(aqi_id))?;

        let features = self
            .assembler
            .assemble(inputs, &AqiReading::new(aqi.aqi_value, aqi.pm25))?;
        self.stage(user_id, DecisionStage::FeaturesAssembled);

        let start = Instant::now();
        let classification = self.model.classify(&features)?;
        metrics::histogram!("risk_inference_seconds").record(start.elapsed().as_secs_f64());
        self.stage(user_id, DecisionStage::Classified);

        let systolic_bp =
            parse_int(inputs.systolic_bp.as_ref()).ok_or(EngineError::InvalidSystolicBp)?;
        let label = classification.label;
        let score = classification.score;
        let decision = self.policy.evaluate(label, score, aqi.aqi_value, systolic_bp);
        self.stage(user_id, DecisionStage::PolicyEvaluated);

        let alert = decision.severity.map(|severity| NewAlert {
            message: self.policy.message(label, score, aqi.aqi_value, systolic_bp),
            severity: severity.as_str().to_string(),
        });
        let persisted = self
            .repository
            .persist_decision(
                NewPrediction {
                    user_id,
                    aqi_id,
                    risk_label: label.as_str().to_string(),
                    risk_score: score,
                    alert_triggered: decision.triggered,
                },
                alert,
            )
            .await?;
        self.stage(user_id, DecisionStage::PredictionPersisted);

        match &persisted.alert {
            Some(alert) => {
                self.stage(user_id, DecisionStage::AlertPersisted);
                metrics::counter!("risk_alerts_total", "severity" => alert.severity.clone())
                    .increment(1);
                warn!(
                    "{} alert {} raised for user {} (prediction {})",
                    alert.severity, alert.alert_id, user_id, alert.prediction_id
                );
            }
            None => self.stage(user_id, DecisionStage::NoAlert),
        }

        self.stage(user_id, DecisionStage::Completed);
        info!(
            "Prediction {} for user {}: {} ({:.4})",
            persisted.prediction.prediction_id, user_id, label, score
        );

        Ok(DecisionResult {
            prediction_id: persisted.prediction.prediction_id,
            risk_label: label,
            risk_score: round4(score),
            alert_triggered: decision.triggered,
        })
    }

    fn stage(&self, user_id: i64, stage: DecisionStage) {
        debug!("Decision for user {}: {}", user_id, stage);
    }
}
