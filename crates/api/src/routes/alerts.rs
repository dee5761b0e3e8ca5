//! Alert Routes

use alerting::Severity;
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
use storage::AlertView;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Owner of the alerts
    pub user_id: Option<i64>,
    /// Filter by severity
    pub severity: Option<String>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Response for alerts endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertResponse {
    pub data: Vec<AlertView>,
    pub count: usize,
}

/// Get a user's alerts joined with their predictions, newest first
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    params: Result<Query<AlertQuery>, QueryRejection>,
) -> Result<Json<AlertResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let user_id = params
        .user_id
        .ok_or_else(|| ApiError::Validation("user_id is required".to_string()))?;
    identity.authorize(user_id)?;

    let severity = params
        .severity
        .as_deref()
        .map(str::parse::<Severity>)
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let limit = params.limit.min(MAX_LIMIT);
    let data = state
        .repository
        .alerts_for_user(user_id, severity.map(|s| s.as_str()), limit)
        .await?;

    Ok(Json(AlertResponse {
        count: data.len(),
        data,
    }))
}
