//! ONNX Model Artifact
//!
//! Runs an exported classifier with tract. The graph takes a `float[1, 7]`
//! input and produces the predicted label (`int64`) followed by the class
//! probabilities (`float[1, n_classes]`).

use crate::model::RiskModel;
use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::debug;

/// Classifier backed by an optimized tract plan
pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
    source: String,
}

impl OnnxModel {
    /// Load and optimize an ONNX model
    pub fn from_path(path: &Path) -> Result<Self, InferenceError> {
        let source = path.display().to_string();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, FEATURE_DIMENSION]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", source, e)))?;

        debug!("Optimized ONNX plan for {}", source);
        Ok(Self { plan, source })
    }

    fn run(&self, features: &FeatureVector) -> Result<TVec<TValue>, InferenceError> {
        let input: Vec<f32> = features.values.iter().map(|v| *v as f32).collect();
        let tensor = Tensor::from_shape(&[1, FEATURE_DIMENSION], &input)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        self.plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }
}

impl RiskModel for OnnxModel {
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        self.predict(features).map(|(class, _)| class)
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        self.predict(features).map(|(_, probabilities)| probabilities)
    }

    /// Both outputs come from one run of the plan
    fn predict(&self, features: &FeatureVector) -> Result<(i64, Vec<f64>), InferenceError> {
        let outputs = self.run(features)?;
        if outputs.len() < 2 {
            return Err(InferenceError::InvalidOutputShape {
                expected: "label and probability outputs".to_string(),
                actual: format!("{} outputs", outputs.len()),
            });
        }

        let labels = outputs[0]
            .to_array_view::<i64>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let class = labels
            .iter()
            .next()
            .copied()
            .ok_or_else(|| InferenceError::InvalidOutputShape {
                expected: "[1]".to_string(),
                actual: format!("{:?}", labels.shape()),
            })?;

        let probabilities = outputs[1]
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        Ok((class, probabilities.iter().map(|p| f64::from(*p)).collect()))
    }

    fn describe(&self) -> String {
        format!("onnx model ({})", self.source)
    }
}
