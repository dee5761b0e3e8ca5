//! Repository Implementation

use crate::memory::MemoryStore;
use crate::records::{
    AlertView, AqiRecord, NewAlert, NewAqiRecord, NewPrediction, PersistedDecision,
    PredictionRecord,
};
use crate::sqlite::SqliteStore;
use crate::StorageError;
use chrono::{Duration, Utc};
use tracing::info;

/// Longest look-back window; keeps the cutoff timestamp representable
const MAX_HISTORY_DAYS: i64 = 36_500;

enum Backend {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

/// Repository for data access
pub struct Repository {
    backend: Backend,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            backend: Backend::Memory(MemoryStore::new()),
        }
    }

    /// Create a repository backed by SQLite
    pub async fn with_sqlite(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        info!("Creating SQLite repository at {}", url);
        Ok(Self {
            backend: Backend::Sqlite(SqliteStore::connect(url, max_connections).await?),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Sqlite(_) => "sqlite",
        }
    }

    /// Record an air-quality reading
    pub async fn insert_aqi(&self, record: NewAqiRecord) -> Result<AqiRecord, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.insert_aqi(record),
            Backend::Sqlite(store) => store.insert_aqi(record).await,
        }
    }

    pub async fn get_aqi(&self, aqi_id: i64) -> Result<Option<AqiRecord>, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.get_aqi(aqi_id),
            Backend::Sqlite(store) => store.get_aqi(aqi_id).await,
        }
    }

    /// Readings fetched within the last `days` days, newest first
    pub async fn aqi_history(&self, days: i64) -> Result<Vec<AqiRecord>, StorageError> {
        let since = Utc::now() - Duration::days(days.clamp(0, MAX_HISTORY_DAYS));
        match &self.backend {
            Backend::Memory(store) => store.aqi_since(since),
            Backend::Sqlite(store) => store.aqi_since(since).await,
        }
    }

    /// Persist a prediction and, when triggered, its alert as one unit
    pub async fn persist_decision(
        &self,
        prediction: NewPrediction,
        alert: Option<NewAlert>,
    ) -> Result<PersistedDecision, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.persist_decision(prediction, alert),
            Backend::Sqlite(store) => store.persist_decision(prediction, alert).await,
        }
    }

    pub async fn predictions_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.predictions_for_user(user_id, limit),
            Backend::Sqlite(store) => store.predictions_for_user(user_id, limit).await,
        }
    }

    pub async fn alerts_for_user(
        &self,
        user_id: i64,
        severity: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AlertView>, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.alerts_for_user(user_id, severity, limit),
            Backend::Sqlite(store) => store.alerts_for_user(user_id, severity, limit).await,
        }
    }

    pub async fn prediction_count(&self) -> Result<usize, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.prediction_count(),
            Backend::Sqlite(store) => store.prediction_count().await,
        }
    }

    pub async fn alert_count(&self) -> Result<usize, StorageError> {
        match &self.backend {
            Backend::Memory(store) => store.alert_count(),
            Backend::Sqlite(store) => store.alert_count().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> NewAqiRecord {
        NewAqiRecord {
            city: "Kolkata".to_string(),
            aqi_value: 155,
            pm25: 61.0,
            pm10: 0.0,
            co: 0.0,
            no2: 0.0,
            o3: 0.0,
        }
    }

    #[tokio::test]
    async fn test_in_memory_history_window() {
        let repo = Repository::new();
        assert_eq!(repo.backend_name(), "memory");

        repo.insert_aqi(reading()).await.unwrap();
        repo.insert_aqi(reading()).await.unwrap();

        let history = repo.aqi_history(7).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].aqi_id > history[1].aqi_id);
    }

    #[tokio::test]
    async fn test_sqlite_backend_selected() {
        let repo = Repository::with_sqlite("sqlite::memory:", 4).await.unwrap();
        assert_eq!(repo.backend_name(), "sqlite");

        let aqi = repo.insert_aqi(reading()).await.unwrap();
        assert_eq!(repo.get_aqi(aqi.aqi_id).await.unwrap().unwrap().city, "Kolkata");
    }
}
