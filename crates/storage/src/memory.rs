//! In-memory backend

use crate::records::{
    check_alert_pairing, AlertRecord, AlertView, AqiRecord, NewAlert, NewAqiRecord,
    NewPrediction, PersistedDecision, PredictionRecord,
};
use crate::StorageError;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct Tables {
    aqi: Vec<AqiRecord>,
    predictions: Vec<PredictionRecord>,
    alerts: Vec<AlertRecord>,
    last_aqi_id: i64,
    last_prediction_id: i64,
    last_alert_id: i64,
}

/// Mutex-guarded tables; ids start at 1
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    pub fn insert_aqi(&self, record: NewAqiRecord) -> Result<AqiRecord, StorageError> {
        let mut tables = self.lock()?;
        tables.last_aqi_id += 1;
        let record = record.into_record(tables.last_aqi_id, Utc::now());
        tables.aqi.push(record.clone());
        debug!("Inserted AQI record with ID {}", record.aqi_id);
        Ok(record)
    }

    pub fn get_aqi(&self, aqi_id: i64) -> Result<Option<AqiRecord>, StorageError> {
        let tables = self.lock()?;
        Ok(tables.aqi.iter().find(|r| r.aqi_id == aqi_id).cloned())
    }

    pub fn aqi_since(&self, since: DateTime<Utc>) -> Result<Vec<AqiRecord>, StorageError> {
        let tables = self.lock()?;
        Ok(tables
            .aqi
            .iter()
            .rev()
            .filter(|r| r.fetched_at >= since)
            .cloned()
            .collect())
    }

    /// Write a prediction and its optional alert under one lock
    pub fn persist_decision(
        &self,
        prediction: NewPrediction,
        alert: Option<NewAlert>,
    ) -> Result<PersistedDecision, StorageError> {
        check_alert_pairing(&prediction, &alert)?;

        let mut tables = self.lock()?;
        if !tables.aqi.iter().any(|r| r.aqi_id == prediction.aqi_id) {
            return Err(StorageError::Integrity(format!(
                "aqi_id {} does not exist",
                prediction.aqi_id
            )));
        }

        let created_at = Utc::now();
        tables.last_prediction_id += 1;
        let prediction = prediction.into_record(tables.last_prediction_id, created_at);
        tables.predictions.push(prediction.clone());

        let alert = alert.map(|alert| {
            tables.last_alert_id += 1;
            let alert = alert.into_record(tables.last_alert_id, &prediction, created_at);
            tables.alerts.push(alert.clone());
            alert
        });

        debug!("Inserted prediction with ID {}", prediction.prediction_id);
        Ok(PersistedDecision { prediction, alert })
    }

    pub fn predictions_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let tables = self.lock()?;
        Ok(tables
            .predictions
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    pub fn alerts_for_user(
        &self,
        user_id: i64,
        severity: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AlertView>, StorageError> {
        let tables = self.lock()?;
        let mut views = Vec::new();

        for alert in tables.alerts.iter().rev() {
            if views.len() >= limit {
                break;
            }
            if alert.user_id != user_id || severity.map_or(false, |s| alert.severity != s) {
                continue;
            }
            let prediction = tables
                .predictions
                .iter()
                .find(|p| p.prediction_id == alert.prediction_id)
                .ok_or_else(|| {
                    StorageError::Integrity(format!(
                        "alert {} references missing prediction {}",
                        alert.alert_id, alert.prediction_id
                    ))
                })?;
            views.push(AlertView {
                alert: alert.clone(),
                risk_label: prediction.risk_label.clone(),
                risk_score: prediction.risk_score,
                aqi_id: prediction.aqi_id,
            });
        }

        Ok(views)
    }

    pub fn prediction_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.predictions.len())
    }

    pub fn alert_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.alerts.len())
    }
}
