//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Air-quality reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiRecord {
    pub aqi_id: i64,
    pub city: String,
    pub aqi_value: i64,
    pub pm25: f64,
    pub pm10: f64,
    pub co: f64,
    pub no2: f64,
    pub o3: f64,
    pub fetched_at: DateTime<Utc>,
}

/// Air-quality reading to insert; pollutant components default to 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAqiRecord {
    pub city: String,
    pub aqi_value: i64,
    pub pm25: f64,
    #[serde(default)]
    pub pm10: f64,
    #[serde(default)]
    pub co: f64,
    #[serde(default)]
    pub no2: f64,
    #[serde(default)]
    pub o3: f64,
}

impl NewAqiRecord {
    pub(crate) fn into_record(self, aqi_id: i64, fetched_at: DateTime<Utc>) -> AqiRecord {
        AqiRecord {
            aqi_id,
            city: self.city,
            aqi_value: self.aqi_value,
            pm25: self.pm25,
            pm10: self.pm10,
            co: self.co,
            no2: self.no2,
            o3: self.o3,
            fetched_at,
        }
    }
}

/// Risk prediction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: i64,
    pub user_id: i64,
    pub aqi_id: i64,
    pub risk_label: String,
    pub risk_score: f64,
    pub alert_triggered: bool,
    pub created_at: DateTime<Utc>,
}

/// Prediction to insert; the store assigns the id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrediction {
    pub user_id: i64,
    pub aqi_id: i64,
    pub risk_label: String,
    pub risk_score: f64,
    pub alert_triggered: bool,
}

impl NewPrediction {
    pub(crate) fn into_record(self, prediction_id: i64, created_at: DateTime<Utc>) -> PredictionRecord {
        PredictionRecord {
            prediction_id,
            user_id: self.user_id,
            aqi_id: self.aqi_id,
            risk_label: self.risk_label,
            risk_score: self.risk_score,
            alert_triggered: self.alert_triggered,
            created_at,
        }
    }
}

/// Alert record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_id: i64,
    pub user_id: i64,
    pub prediction_id: i64,
    pub message: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
}

/// Alert to insert alongside its prediction.
///
/// Owner and prediction reference are taken from the prediction written in
/// the same unit, so an alert can never point elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub message: String,
    pub severity: String,
}

impl NewAlert {
    pub(crate) fn into_record(
        self,
        alert_id: i64,
        prediction: &PredictionRecord,
        created_at: DateTime<Utc>,
    ) -> AlertRecord {
        AlertRecord {
            alert_id,
            user_id: prediction.user_id,
            prediction_id: prediction.prediction_id,
            message: self.message,
            severity: self.severity,
            created_at,
        }
    }
}

/// Alert joined with the prediction that spawned it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: AlertRecord,
    pub risk_label: String,
    pub risk_score: f64,
    pub aqi_id: i64,
}

/// Records written for one decision
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedDecision {
    pub prediction: PredictionRecord,
    pub alert: Option<AlertRecord>,
}

/// An alert must accompany a prediction exactly when it is flagged as triggered
pub(crate) fn check_alert_pairing(
    prediction: &NewPrediction,
    alert: &Option<NewAlert>,
) -> Result<(), crate::StorageError> {
    if prediction.alert_triggered != alert.is_some() {
        return Err(crate::StorageError::Integrity(format!(
            "prediction alert_triggered={} but alert {}",
            prediction.alert_triggered,
            if alert.is_some() { "supplied" } else { "missing" }
        )));
    }
    Ok(())
}
