//! Decision Error Types

use feature_engine::FeatureError;
use inference_engine::InferenceError;
use std::fmt;
use storage::StorageError;
use thiserror::Error;

/// Failure class reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input missing or malformed
    Validation,
    /// Referenced AQI record does not exist
    NotFound,
    /// Model not loaded
    Unavailable,
    /// Persistence failed or stored data is unusable
    Storage,
    /// Model produced an unusable result
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a single decision
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("systolic_bp must be an integer")]
    InvalidSystolicBp,

    #[error("AQI record {0} not found")]
    AqiNotFound(i64),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Feature(FeatureError::MissingField(_)) => ErrorKind::Validation,
            // pm25 comes from the AQI store, not the caller
            EngineError::Feature(FeatureError::InvalidPm25(_)) => ErrorKind::Storage,
            EngineError::InvalidSystolicBp => ErrorKind::Validation,
            EngineError::AqiNotFound(_) => ErrorKind::NotFound,
            EngineError::Inference(
                InferenceError::ModelUnavailable(_) | InferenceError::ModelLoadError(_),
            ) => ErrorKind::Unavailable,
            EngineError::Inference(_) => ErrorKind::Internal,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }
}
