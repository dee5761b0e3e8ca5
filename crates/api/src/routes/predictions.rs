//! Prediction Routes

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{default_limit, MAX_LIMIT};
use crate::auth::Identity;
use crate::error::ApiError;
use crate::AppState;
use storage::PredictionRecord;

/// Query parameters for predictions endpoint
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Owner of the predictions
    pub user_id: Option<i64>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Response for predictions endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub data: Vec<PredictionRecord>,
    pub count: usize,
}

/// Get a user's predictions, newest first
pub async fn get_predictions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    params: Result<Query<PredictionQuery>, QueryRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let user_id = params
        .user_id
        .ok_or_else(|| ApiError::Validation("user_id is required".to_string()))?;
    identity.authorize(user_id)?;

    let limit = params.limit.min(MAX_LIMIT);
    let data = state.repository.predictions_for_user(user_id, limit).await?;

    Ok(Json(PredictionResponse {
        count: data.len(),
        data,
    }))
}
