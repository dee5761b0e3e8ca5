//! Alerting System
//!
//! Decides from model output and raw vitals whether a risk prediction
//! escalates to a health alert, and at which severity.

mod policy;

pub use policy::{AlertConfig, AlertDecision, AlertPolicy, Severity};

use thiserror::Error;

/// Alerting errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    #[error("Unknown alert severity: {0}")]
    UnknownSeverity(String),
    #[error("Invalid alert threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}
