//! Air-Quality Routes

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;
use storage::{AqiRecord, NewAqiRecord};

/// Query parameters for AQI history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Look-back window in days
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

/// Response for AQI history endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct AqiHistoryResponse {
    pub data: Vec<AqiRecord>,
    pub count: usize,
}

fn validate_reading(reading: &NewAqiRecord) -> Result<(), ApiError> {
    if reading.city.trim().is_empty() {
        return Err(ApiError::Validation("city is required".to_string()));
    }
    if reading.aqi_value < 0 {
        return Err(ApiError::Validation("aqi_value must not be negative".to_string()));
    }
    let components = [
        ("pm25", reading.pm25),
        ("pm10", reading.pm10),
        ("co", reading.co),
        ("no2", reading.no2),
        ("o3", reading.o3),
    ];
    for (name, value) in components {
        if !value.is_finite() || value < 0.0 {
            return Err(ApiError::Validation(format!(
                "{} must be a non-negative number",
                name
            )));
        }
    }
    Ok(())
}

/// Record an air-quality reading
pub async fn record_aqi(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewAqiRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<AqiRecord>), ApiError> {
    let Json(reading) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    validate_reading(&reading)?;

    let record = state.repository.insert_aqi(reading).await?;
    info!(
        "Recorded AQI {} for {} (aqi_id {})",
        record.aqi_value, record.city, record.aqi_id
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Readings from the last `days` days, newest first
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<AqiHistoryResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    if params.days < 0 {
        return Err(ApiError::Validation("days must not be negative".to_string()));
    }

    let data = state.repository.aqi_history(params.days).await?;
    Ok(Json(AqiHistoryResponse {
        count: data.len(),
        data,
    }))
}
