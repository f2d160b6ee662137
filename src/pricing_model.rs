//! Trained pricing model: scorer parameters plus static evaluation metadata.
//!
//! The artifact is a JSON document produced offline by the `fit_model` binary. It holds
//! one scorer (tagged by `kind`), the train/test metrics and the feature-importance
//! ranking. It is validated once at load and is read-only afterwards.

use crate::encoder::{EncodedFeatures, FEATURE_COUNT, FEATURE_NAMES, SMOKER_FEATURE};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{what} has {found} entries, expected {expected}")]
    FeatureCount {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("tree {tree} node {node}: {message}")]
    InvalidTree {
        tree: usize,
        node: usize,
        message: String,
    },
    #[error("scorer lowers the premium for smokers: {0}")]
    SmokerNotMonotone(String),
    #[error("{0}")]
    Invalid(String),
}

/// Anything that maps an encoded feature vector to a base premium.
pub trait PremiumScorer: Send + Sync {
    /// Predicted monthly premium in rupees. May be negative; callers floor it.
    fn predict(&self, features: &[f64]) -> f64;

    /// Short identifier reported in logs and metrics.
    fn kind(&self) -> &'static str;

    /// Structural checks run once at load.
    fn validate(&self) -> Result<(), ArtifactError>;
}

// ============ Linear scorer ============

/// Ridge regression over standardized features:
/// `intercept + Σ weight_j × (x_j − mean_j) / scale_j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    pub intercept: f64,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub weights: Vec<f64>,
}

impl PremiumScorer for LinearScorer {
    fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + features
                .iter()
                .zip(&self.means)
                .zip(&self.scales)
                .zip(&self.weights)
                .map(|(((x, mean), scale), weight)| weight * (x - mean) / scale)
                .sum::<f64>()
    }

    fn kind(&self) -> &'static str {
        "linear"
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        for (what, values) in [
            ("means", &self.means),
            ("scales", &self.scales),
            ("weights", &self.weights),
        ] {
            if values.len() != FEATURE_COUNT {
                return Err(ArtifactError::FeatureCount {
                    what,
                    expected: FEATURE_COUNT,
                    found: values.len(),
                });
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ArtifactError::NonFinite(what));
            }
        }
        if !self.intercept.is_finite() {
            return Err(ArtifactError::NonFinite("intercept"));
        }
        if self.scales.iter().any(|s| *s <= 0.0) {
            return Err(ArtifactError::Invalid(
                "linear scales must be strictly positive".to_string(),
            ));
        }
        let smoker_weight = self.weights[SMOKER_FEATURE];
        if smoker_weight < 0.0 {
            return Err(ArtifactError::SmokerNotMonotone(format!(
                "smoker weight is {}",
                smoker_weight
            )));
        }
        Ok(())
    }
}

// ============ Tree ensemble scorer ============

/// One node of a regression tree stored as a flat array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go `left` when `features[feature] <= threshold`, otherwise `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        // Children always point forward, so this walk terminates.
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().unwrap_or(0.0);
                    index = if x <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }

    /// Smallest and largest leaf value reachable from `index`.
    fn leaf_range(&self, index: usize) -> (f64, f64) {
        match &self.nodes[index] {
            TreeNode::Leaf { value } => (*value, *value),
            TreeNode::Split { left, right, .. } => {
                let (lmin, lmax) = self.leaf_range(*left);
                let (rmin, rmax) = self.leaf_range(*right);
                (lmin.min(rmin), lmax.max(rmax))
            }
        }
    }

    fn validate(&self, tree: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::InvalidTree {
                tree,
                node: 0,
                message: "tree has no nodes".to_string(),
            });
        }
        let invalid = |node: usize, message: String| ArtifactError::InvalidTree {
            tree,
            node,
            message,
        };

        for (node, entry) in self.nodes.iter().enumerate() {
            match entry {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(invalid(node, "leaf value is not finite".to_string()));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(invalid(node, format!("feature {} out of range", feature)));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(node, "threshold is not finite".to_string()));
                    }
                    for child in [*left, *right] {
                        if child <= node || child >= self.nodes.len() {
                            return Err(invalid(
                                node,
                                format!("child index {} is not a forward in-bounds index", child),
                            ));
                        }
                    }
                }
            }
        }

        // Every split on the smoker flag must send smokers to leaves that are no cheaper
        // than any non-smoker leaf under the same split.
        for (node, entry) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature: SMOKER_FEATURE,
                left,
                right,
                ..
            } = entry
            {
                let (_, non_smoker_max) = self.leaf_range(*left);
                let (smoker_min, _) = self.leaf_range(*right);
                if smoker_min < non_smoker_max {
                    return Err(ArtifactError::SmokerNotMonotone(format!(
                        "tree {} node {} smoker leaf {} below non-smoker leaf {}",
                        tree, node, smoker_min, non_smoker_max
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Gradient-boosted regression trees: `init + learning_rate × Σ tree(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleScorer {
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl PremiumScorer for TreeEnsembleScorer {
    fn predict(&self, features: &[f64]) -> f64 {
        self.init
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|tree| tree.evaluate(features))
                    .sum::<f64>()
    }

    fn kind(&self) -> &'static str {
        "gradient_boosted"
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if !self.init.is_finite() {
            return Err(ArtifactError::NonFinite("init"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ArtifactError::Invalid(
                "learning_rate must be a positive number".to_string(),
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index)?;
        }
        Ok(())
    }
}

// ============ Artifact ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scorer {
    Linear(LinearScorer),
    GradientBoosted(TreeEnsembleScorer),
}

impl Scorer {
    pub fn as_scorer(&self) -> &dyn PremiumScorer {
        match self {
            Scorer::Linear(scorer) => scorer,
            Scorer::GradientBoosted(scorer) => scorer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub train_r2: f64,
    pub test_r2: f64,
    pub train_mae: f64,
    pub test_mae: f64,
    pub train_rmse: f64,
    pub test_rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub total_samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub features: usize,
}

/// On-disk model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_name: String,
    pub training_date: NaiveDate,
    pub scorer: Scorer,
    pub metrics: EvaluationMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    #[serde(default)]
    pub hyperparameters: serde_json::Map<String, serde_json::Value>,
    pub dataset_info: DatasetInfo,
}

/// A validated, immutable pricing model.
#[derive(Debug, Clone)]
pub struct PricingModel {
    artifact: ModelArtifact,
}

/// Slack allowed on the feature-importance total, which is rounded per entry.
const IMPORTANCE_TOLERANCE: f64 = 0.5;

impl PricingModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        let model = Self::from_artifact(artifact)?;
        tracing::info!(
            "Loaded {} model '{}' trained {} from {}",
            model.scorer().kind(),
            model.artifact.model_name,
            model.artifact.training_date,
            path.display()
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ArtifactError> {
        artifact.scorer.as_scorer().validate()?;

        if artifact.dataset_info.features != FEATURE_COUNT {
            return Err(ArtifactError::FeatureCount {
                what: "dataset_info.features",
                expected: FEATURE_COUNT,
                found: artifact.dataset_info.features,
            });
        }
        if let Some(unknown) = artifact
            .feature_importance
            .iter()
            .find(|entry| !FEATURE_NAMES.contains(&entry.feature.as_str()))
        {
            return Err(ArtifactError::Invalid(format!(
                "feature_importance names unknown feature '{}'",
                unknown.feature
            )));
        }
        if artifact
            .feature_importance
            .iter()
            .any(|entry| !entry.importance.is_finite() || entry.importance < 0.0)
        {
            return Err(ArtifactError::NonFinite("feature_importance"));
        }
        let total: f64 = artifact.feature_importance.iter().map(|e| e.importance).sum();
        if (total - 100.0).abs() > IMPORTANCE_TOLERANCE {
            return Err(ArtifactError::Invalid(format!(
                "feature_importance sums to {:.2}, expected 100",
                total
            )));
        }

        Ok(Self { artifact })
    }

    /// Base predicted monthly premium for the encoded request.
    pub fn predict(&self, features: &EncodedFeatures) -> f64 {
        self.scorer().predict(features.values())
    }

    pub fn scorer(&self) -> &dyn PremiumScorer {
        self.artifact.scorer.as_scorer()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn metrics(&self) -> &EvaluationMetrics {
        &self.artifact.metrics
    }

    pub fn feature_importance(&self) -> &[FeatureImportance] {
        &self.artifact.feature_importance
    }
}
