//! Model artifact interface

use crate::InferenceError;
use feature_engine::FeatureVector;

/// A trained multi-class classifier over the 7-feature risk vector.
///
/// Implementations are immutable after construction so a single instance can
/// serve any number of concurrent callers.
pub trait RiskModel: Send + Sync {
    /// Predicted class label
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, InferenceError>;

    /// Per-class probabilities, in class order
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError>;

    /// Label and probabilities from a single evaluation
    fn predict(&self, features: &FeatureVector) -> Result<(i64, Vec<f64>), InferenceError> {
        Ok((self.predict_class(features)?, self.predict_proba(features)?))
    }

    /// Short human-readable description for logs and health output
    fn describe(&self) -> String;
}
