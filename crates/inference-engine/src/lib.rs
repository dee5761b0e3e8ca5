//! Risk Classifier Adapter
//!
//! Wraps a pre-trained cardiovascular risk classifier that is loaded once at
//! startup and shared read-only for the lifetime of the process.

mod engine;
mod forest;
mod model;
mod onnx;

pub use engine::{Classification, ModelHandle, RiskLabel};
pub use forest::{DecisionTree, ForestModel, TreeNode};
pub use model::RiskModel;
pub use onnx::OnnxModel;

use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid output shape: expected {expected}, got {actual}")]
    InvalidOutputShape { expected: String, actual: String },
}
