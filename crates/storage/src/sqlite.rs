//! SQLite backend

use crate::records::{
    check_alert_pairing, AlertRecord, AlertView, AqiRecord, NewAlert, NewAqiRecord,
    NewPrediction, PersistedDecision, PredictionRecord,
};
use crate::StorageError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS aqi_records (
        aqi_id INTEGER PRIMARY KEY AUTOINCREMENT,
        city TEXT NOT NULL,
        aqi_value INTEGER NOT NULL,
        pm25 REAL NOT NULL,
        pm10 REAL NOT NULL DEFAULT 0,
        co REAL NOT NULL DEFAULT 0,
        no2 REAL NOT NULL DEFAULT 0,
        o3 REAL NOT NULL DEFAULT 0,
        fetched_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS risk_predictions (
        prediction_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        aqi_id INTEGER NOT NULL REFERENCES aqi_records(aqi_id),
        risk_label TEXT NOT NULL,
        risk_score REAL NOT NULL,
        alert_triggered INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS alerts (
        alert_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        prediction_id INTEGER NOT NULL UNIQUE REFERENCES risk_predictions(prediction_id),
        message TEXT NOT NULL,
        severity TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_aqi_fetched_at ON aqi_records(fetched_at)",
    "CREATE INDEX IF NOT EXISTS idx_predictions_user ON risk_predictions(user_id, prediction_id)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_user ON alerts(user_id, alert_id)",
];

/// Fixed-width UTC timestamps so text comparison matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("timestamp {:?}: {}", raw, e)))
}

fn aqi_from_row(row: &SqliteRow) -> Result<AqiRecord, StorageError> {
    Ok(AqiRecord {
        aqi_id: row.try_get("aqi_id")?,
        city: row.try_get("city")?,
        aqi_value: row.try_get("aqi_value")?,
        pm25: row.try_get("pm25")?,
        pm10: row.try_get("pm10")?,
        co: row.try_get("co")?,
        no2: row.try_get("no2")?,
        o3: row.try_get("o3")?,
        fetched_at: parse_timestamp(row.try_get("fetched_at")?)?,
    })
}

fn prediction_from_row(row: &SqliteRow) -> Result<PredictionRecord, StorageError> {
    Ok(PredictionRecord {
        prediction_id: row.try_get("prediction_id")?,
        user_id: row.try_get("user_id")?,
        aqi_id: row.try_get("aqi_id")?,
        risk_label: row.try_get("risk_label")?,
        risk_score: row.try_get("risk_score")?,
        alert_triggered: row.try_get("alert_triggered")?,
        created_at: parse_timestamp(row.try_get("created_at")?)?,
    })
}

fn alert_view_from_row(row: &SqliteRow) -> Result<AlertView, StorageError> {
    Ok(AlertView {
        alert: AlertRecord {
            alert_id: row.try_get("alert_id")?,
            user_id: row.try_get("user_id")?,
            prediction_id: row.try_get("prediction_id")?,
            message: row.try_get("message")?,
            severity: row.try_get("severity")?,
            created_at: parse_timestamp(row.try_get("created_at")?)?,
        },
        risk_label: row.try_get("risk_label")?,
        risk_score: row.try_get("risk_score")?,
        aqi_id: row.try_get("aqi_id")?,
    })
}

/// Pooled SQLite store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect, enabling foreign keys and creating the schema.
    ///
    /// In-memory databases are pinned to a single long-lived connection so
    /// every query sees the same database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let mut options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections.max(1) })
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Connected to SQLite database {}", url);
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("SQLite schema ready");
        Ok(())
    }

    pub async fn insert_aqi(&self, record: NewAqiRecord) -> Result<AqiRecord, StorageError> {
        let fetched_at = Utc::now();
        let aqi_id = sqlx::query(
            "INSERT INTO aqi_records (city, aqi_value, pm25, pm10, co, no2, o3, fetched_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.city.as_str())
        .bind(record.aqi_value)
        .bind(record.pm25)
        .bind(record.pm10)
        .bind(record.co)
        .bind(record.no2)
        .bind(record.o3)
        .bind(format_timestamp(&fetched_at))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!("Inserted AQI record with ID {}", aqi_id);
        Ok(record.into_record(aqi_id, fetched_at))
    }

    pub async fn get_aqi(&self, aqi_id: i64) -> Result<Option<AqiRecord>, StorageError> {
        let row = sqlx::query("SELECT * FROM aqi_records WHERE aqi_id = ?")
            .bind(aqi_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(aqi_from_row).transpose()
    }

    pub async fn aqi_since(&self, since: DateTime<Utc>) -> Result<Vec<AqiRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM aqi_records WHERE fetched_at >= ? ORDER BY aqi_id DESC",
        )
        .bind(format_timestamp(&since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(aqi_from_row).collect()
    }

    /// Write a prediction and its optional alert in one transaction.
    ///
    /// The prediction row is inserted first; the alert row carries its id.
    /// Any failure rolls back both.
    pub async fn persist_decision(
        &self,
        prediction: NewPrediction,
        alert: Option<NewAlert>,
    ) -> Result<PersistedDecision, StorageError> {
        check_alert_pairing(&prediction, &alert)?;

        let created_at = Utc::now();
        let timestamp = format_timestamp(&created_at);
        let mut tx = self.pool.begin().await?;

        let prediction_id = sqlx::query(
            "INSERT INTO risk_predictions
                (user_id, aqi_id, risk_label, risk_score, alert_triggered, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(prediction.user_id)
        .bind(prediction.aqi_id)
        .bind(prediction.risk_label.as_str())
        .bind(prediction.risk_score)
        .bind(prediction.alert_triggered)
        .bind(timestamp.as_str())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        let prediction = prediction.into_record(prediction_id, created_at);

        let alert = match alert {
            Some(alert) => {
                let alert_id = sqlx::query(
                    "INSERT INTO alerts (user_id, prediction_id, message, severity, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(prediction.user_id)
                .bind(prediction.prediction_id)
                .bind(alert.message.as_str())
                .bind(alert.severity.as_str())
                .bind(timestamp.as_str())
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();
                Some(alert.into_record(alert_id, &prediction, created_at))
            }
            None => None,
        };

        tx.commit().await?;
        debug!("Inserted prediction with ID {}", prediction.prediction_id);
        Ok(PersistedDecision { prediction, alert })
    }

    pub async fn predictions_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM risk_predictions WHERE user_id = ?
             ORDER BY prediction_id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(prediction_from_row).collect()
    }

    pub async fn alerts_for_user(
        &self,
        user_id: i64,
        severity: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AlertView>, StorageError> {
        let rows = sqlx::query(
            "SELECT a.alert_id, a.user_id, a.prediction_id, a.message, a.severity, a.created_at,
                    rp.risk_label, rp.risk_score, rp.aqi_id
             FROM alerts a
             JOIN risk_predictions rp ON a.prediction_id = rp.prediction_id
             WHERE a.user_id = ? AND (? IS NULL OR a.severity = ?)
             ORDER BY a.alert_id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(severity)
        .bind(severity)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(alert_view_from_row).collect()
    }

    async fn count(&self, table: &'static str) -> Result<usize, StorageError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as usize)
    }

    pub async fn prediction_count(&self) -> Result<usize, StorageError> {
        self.count("risk_predictions").await
    }

    pub async fn alert_count(&self) -> Result<usize, StorageError> {
        self.count("alerts").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn reading() -> NewAqiRecord {
        NewAqiRecord {
            city: "Delhi".to_string(),
            aqi_value: 180,
            pm25: 95.25,
            pm10: 140.0,
            co: 300.5,
            no2: 22.0,
            o3: 41.0,
        }
    }

    fn prediction(aqi_id: i64, alert_triggered: bool) -> NewPrediction {
        NewPrediction {
            user_id: 11,
            aqi_id,
            risk_label: "High".to_string(),
            risk_score: 0.9512,
            alert_triggered,
        }
    }

    #[tokio::test]
    async fn test_aqi_round_trip() {
        let store = store().await;
        let inserted = store.insert_aqi(reading()).await.unwrap();
        let fetched = store.get_aqi(inserted.aqi_id).await.unwrap().unwrap();

        assert_eq!(fetched.city, "Delhi");
        assert_eq!(fetched.aqi_value, 180);
        assert_eq!(fetched.pm25, 95.25);
        assert!(store.get_aqi(inserted.aqi_id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decision_with_alert() {
        let store = store().await;
        let aqi = store.insert_aqi(reading()).await.unwrap();
        let written = store
            .persist_decision(
                prediction(aqi.aqi_id, true),
                Some(NewAlert {
                    message: "Health Alert".to_string(),
                    severity: "Emergency".to_string(),
                }),
            )
            .await
            .unwrap();

        let alert = written.alert.unwrap();
        assert_eq!(alert.prediction_id, written.prediction.prediction_id);

        let views = store.alerts_for_user(11, None, 10).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].alert.severity, "Emergency");
        assert_eq!(views[0].risk_label, "High");
        assert_eq!(views[0].aqi_id, aqi.aqi_id);

        let filtered = store.alerts_for_user(11, Some("High"), 10).await.unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_key_failure_rolls_back() {
        let store = store().await;
        let result = store.persist_decision(prediction(404, false), None).await;

        assert!(result.is_err());
        assert_eq!(store.prediction_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prediction_history() {
        let store = store().await;
        let aqi = store.insert_aqi(reading()).await.unwrap();
        for _ in 0..3 {
            store
                .persist_decision(prediction(aqi.aqi_id, false), None)
                .await
                .unwrap();
        }

        let history = store.predictions_for_user(11, 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].prediction_id > history[1].prediction_id);
        assert!(!history[0].alert_triggered);
        assert_eq!(store.prediction_count().await.unwrap(), 3);
        assert_eq!(store.alert_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_aqi_since_filters_old_readings() {
        let store = store().await;
        store.insert_aqi(reading()).await.unwrap();

        let recent = store
            .aqi_since(Utc::now() - chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let future = store
            .aqi_since(Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap();
        assert!(future.is_empty());
    }
}
