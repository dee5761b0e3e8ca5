//! Feature Assembly Error Types

use thiserror::Error;

/// Errors raised while assembling a feature vector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// A required request field was not supplied at all
    #[error("{0} is required")]
    MissingField(&'static str),

    /// PM2.5 from the air-quality store is not a usable number
    #[error("pm25 value {0} is not a finite number")]
    InvalidPm25(f64),
}
