//! Storage Layer
//!
//! Append-only persistence for risk predictions, their alerts, and the
//! air-quality readings predictions refer to. Provides an in-memory backend
//! and a SQLite backend behind one repository.

mod memory;
mod records;
mod repository;
mod sqlite;

pub use memory::MemoryStore;
pub use records::{
    AlertRecord, AlertView, AqiRecord, NewAlert, NewAqiRecord, NewPrediction, PersistedDecision,
    PredictionRecord,
};
pub use repository::Repository;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Integrity violation: {0}")]
    Integrity(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_unique_violation() => {
                StorageError::Integrity(db.message().to_string())
            }
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}
