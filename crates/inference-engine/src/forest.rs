//! Random Forest Model Artifact
//!
//! JSON serialization of a fitted tree ensemble. Each tree is a flat node
//! array rooted at index 0; a split sends the sample left when
//! `x[feature] <= threshold`. Class probabilities are the mean of the
//! normalized leaf distributions across trees.

use crate::model::RiskModel;
use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A single node in a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Decision tree stored as a flat node array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf_for(&self, features: &[f64]) -> Result<&[f64], InferenceError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Some(TreeNode::Leaf { value }) => return Ok(value.as_slice()),
                None => {
                    return Err(InferenceError::InferenceFailed(format!(
                        "tree node {} does not exist",
                        idx
                    )))
                }
            }
        }
    }

    /// Check structure and normalize leaf weights into probabilities
    fn validate(&mut self, tree_idx: usize, n_classes: usize) -> Result<(), InferenceError> {
        let len = self.nodes.len();
        if len == 0 {
            return Err(invalid(format!("tree {} has no nodes", tree_idx)));
        }

        for (idx, node) in self.nodes.iter_mut().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_DIMENSION {
                        return Err(invalid(format!(
                            "tree {} node {} splits on feature {} (only {} features)",
                            tree_idx, idx, feature, FEATURE_DIMENSION
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(invalid(format!(
                            "tree {} node {} has a NaN threshold",
                            tree_idx, idx
                        )));
                    }
                    // Children must point forward so traversal always terminates
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(invalid(format!(
                                "tree {} node {} has invalid child {}",
                                tree_idx, idx, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(invalid(format!(
                            "tree {} leaf {} has {} weights, expected {}",
                            tree_idx,
                            idx,
                            value.len(),
                            n_classes
                        )));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(invalid(format!(
                            "tree {} leaf {} has a negative or non-finite weight",
                            tree_idx, idx
                        )));
                    }
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 {
                        return Err(invalid(format!(
                            "tree {} leaf {} has zero total weight",
                            tree_idx, idx
                        )));
                    }
                    value.iter_mut().for_each(|w| *w /= total);
                }
            }
        }

        Ok(())
    }
}

fn invalid(reason: String) -> InferenceError {
    InferenceError::ModelLoadError(reason)
}

/// Random forest classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    /// Number of input features the forest was fitted on
    n_features: usize,
    /// Class label for each probability column
    classes: Vec<i64>,
    /// Trees of the ensemble
    trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Build a forest, validating its structure
    pub fn new(classes: Vec<i64>, trees: Vec<DecisionTree>) -> Result<Self, InferenceError> {
        Self {
            n_features: FEATURE_DIMENSION,
            classes,
            trees,
        }
        .validated()
    }

    /// Parse a forest from its JSON artifact
    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        let forest: ForestModel = serde_json::from_str(json)
            .map_err(|e| invalid(format!("malformed forest artifact: {}", e)))?;
        forest.validated()
    }

    /// Read and parse a JSON artifact from disk
    pub fn from_path(path: &Path) -> Result<Self, InferenceError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    fn validated(mut self) -> Result<Self, InferenceError> {
        if self.n_features != FEATURE_DIMENSION {
            return Err(invalid(format!(
                "forest expects {} features, feature vector has {}",
                self.n_features, FEATURE_DIMENSION
            )));
        }
        if self.classes.is_empty() {
            return Err(invalid("forest has no classes".to_string()));
        }
        if self.trees.is_empty() {
            return Err(invalid("forest has no trees".to_string()));
        }

        let n_classes = self.classes.len();
        for (idx, tree) in self.trees.iter_mut().enumerate() {
            tree.validate(idx, n_classes)?;
        }

        debug!(
            "Validated forest: {} trees, {} classes",
            self.trees.len(),
            n_classes
        );
        Ok(self)
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl RiskModel for ForestModel {
    fn predict_class(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        self.predict(features).map(|(class, _)| class)
    }

    fn predict(&self, features: &FeatureVector) -> Result<(i64, Vec<f64>), InferenceError> {
        let probabilities = self.predict_proba(features)?;

        // First maximum wins on ties
        let mut best = 0;
        for (idx, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = idx;
            }
        }

        let class = self.classes.get(best).copied().ok_or_else(|| {
            InferenceError::InferenceFailed(format!("no class for column {}", best))
        })?;
        Ok((class, probabilities))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_for(features.as_slice())?;
            for (total, p) in totals.iter_mut().zip(leaf) {
                *total += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n_trees).collect())
    }

    fn describe(&self) -> String {
        format!(
            "random forest ({} trees, {} classes)",
            self.trees.len(),
            self.classes.len()
        )
    }
}
