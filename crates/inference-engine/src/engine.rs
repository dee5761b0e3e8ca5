//! Classifier Adapter Implementation

use crate::forest::ForestModel;
use crate::model::RiskModel;
use crate::onnx::OnnxModel;
use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info};

/// Cardiovascular risk tier predicted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Moderate,
    High,
    /// Class index outside the known tiers
    Unknown,
}

impl RiskLabel {
    /// Map a predicted class index to its tier
    pub fn from_class(class: i64) -> Self {
        match class {
            0 => RiskLabel::Low,
            1 => RiskLabel::Moderate,
            2 => RiskLabel::High,
            _ => RiskLabel::Unknown,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low",
            RiskLabel::Moderate => "Moderate",
            RiskLabel::High => "High",
            RiskLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(RiskLabel::Low),
            "Moderate" => Ok(RiskLabel::Moderate),
            "High" => Ok(RiskLabel::High),
            "Unknown" => Ok(RiskLabel::Unknown),
            other => Err(InferenceError::InferenceFailed(format!(
                "unknown risk label {}",
                other
            ))),
        }
    }
}

/// Result of classifying one feature vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Predicted risk tier
    pub label: RiskLabel,
    /// Highest class probability, i.e. the model's confidence in `label`
    pub score: f64,
    /// Raw predicted class
    pub class_index: i64,
    /// Probabilities for each class
    pub probabilities: Vec<f64>,
    /// Inference latency in microseconds
    pub latency_us: u64,
}

enum ModelState {
    Ready(Box<dyn RiskModel>),
    Unavailable(String),
}

/// Process-wide handle to the risk model.
///
/// Loaded once at startup. If loading fails the handle stays unavailable for
/// the rest of the process and every `classify` call fails immediately; there
/// is no implicit reload.
pub struct ModelHandle {
    source: String,
    state: ModelState,
}

impl ModelHandle {
    /// Load a model artifact, picking the backend from the file extension
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = path.display().to_string();
        info!("Loading risk model from {}", source);

        let state = match load_artifact(path) {
            Ok(model) => {
                info!("Risk model loaded: {}", model.describe());
                ModelState::Ready(model)
            }
            Err(e) => {
                error!("Risk model unavailable: {}", e);
                ModelState::Unavailable(e.to_string())
            }
        };

        Self { source, state }
    }

    /// Wrap an already constructed model
    pub fn from_model<M: RiskModel + 'static>(model: M) -> Self {
        Self {
            source: model.describe(),
            state: ModelState::Ready(Box::new(model)),
        }
    }

    /// Handle that never becomes available
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            source: "none".to_string(),
            state: ModelState::Unavailable(reason.into()),
        }
    }

    /// Check if a model is loaded
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// Where the model came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Why the model could not be loaded, if it could not
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Ready(_) => None,
            ModelState::Unavailable(reason) => Some(reason.as_str()),
        }
    }

    /// Fail fast when no model is loaded
    pub fn ensure_available(&self) -> Result<(), InferenceError> {
        self.model().map(|_| ())
    }

    fn model(&self) -> Result<&dyn RiskModel, InferenceError> {
        match &self.state {
            ModelState::Ready(model) => Ok(model.as_ref()),
            ModelState::Unavailable(reason) => {
                Err(InferenceError::ModelUnavailable(reason.clone()))
            }
        }
    }

    /// Run inference on a feature vector
    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, InferenceError> {
        let model = self.model()?;
        let start = Instant::now();

        let (class_index, probabilities) = model.predict(features)?;

        if probabilities.iter().any(|p| p.is_nan()) {
            return Err(InferenceError::InferenceFailed(
                "model returned a NaN probability".to_string(),
            ));
        }
        let score = probabilities
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or_else(|| {
                InferenceError::InferenceFailed("model returned no probabilities".to_string())
            })?
            .clamp(0.0, 1.0);

        let label = RiskLabel::from_class(class_index);
        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            "Classified as {} (class={}, score={:.4}) in {}us",
            label, class_index, score, latency_us
        );

        Ok(Classification {
            label,
            score,
            class_index,
            probabilities,
            latency_us,
        })
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn load_artifact(path: &Path) -> Result<Box<dyn RiskModel>, InferenceError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Box::new(ForestModel::from_path(path)?)),
        Some("onnx") => Ok(Box::new(OnnxModel::from_path(path)?)),
        other => Err(InferenceError::ModelLoadError(format!(
            "unsupported model artifact extension {:?}",
            other
        ))),
    }
}
