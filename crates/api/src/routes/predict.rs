//! Risk Prediction Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use decision_engine::{DecisionResult, EngineError};
use feature_engine::HealthInputs;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::AppState;

/// Request body for the predict endpoint.
///
/// Every key is required; health values may be null, strings or numbers.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub aqi_id: Option<Value>,
    #[serde(flatten)]
    pub health: HealthInputs,
}

/// Ids are whole numbers or integer strings. Unlike health values they are
/// never truncated or coerced from booleans.
fn required_id(value: Option<&Value>, name: &str) -> Result<i64, ApiError> {
    let value = value.ok_or_else(|| ApiError::Validation(format!("{} is required", name)))?;
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.ok_or_else(|| ApiError::Validation(format!("{} must be an integer", name)))
}

/// Run a risk decision
pub async fn predict(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<DecisionResult>, ApiError> {
    // Fail fast before looking at the payload when no model is loaded
    state
        .engine
        .model()
        .ensure_available()
        .map_err(EngineError::from)?;

    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let user_id = required_id(request.user_id.as_ref(), "user_id")?;
    let aqi_id = required_id(request.aqi_id.as_ref(), "aqi_id")?;
    identity.authorize(user_id)?;

    debug!(
        "Predict request from user {} ({}) for user {} with aqi {}",
        identity.user_id, identity.role, user_id, aqi_id
    );

    let result = state.engine.decide(user_id, aqi_id, &request.health).await?;
    Ok(Json(result))
}
