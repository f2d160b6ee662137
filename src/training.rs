//! Offline fit of the linear pricing model from the reference population.
//!
//! Standardized ridge regression solved through the normal equations. Every fifth
//! record (index 0, 5, 10, ...) is held out for evaluation.

use crate::encoder::{FEATURE_COUNT, FEATURE_NAMES};
use crate::pricing_model::{
    ArtifactError, DatasetInfo, EvaluationMetrics, FeatureImportance, LinearScorer,
    ModelArtifact, PremiumScorer, PricingModel, Scorer,
};
use crate::reference_data::ReferenceDataset;
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

pub const TEST_EVERY: usize = 5;
pub const MIN_RECORDS: usize = 2 * FEATURE_COUNT;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("need at least {MIN_RECORDS} records to fit, got {found}")]
    TooFewRecords { found: usize },
    #[error("normal equations are singular; try a larger alpha")]
    Singular,
    #[error("fitted model failed validation: {0}")]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone)]
pub struct RidgeOptions {
    pub alpha: f64,
    pub training_date: NaiveDate,
}

struct Sample {
    x: [f64; FEATURE_COUNT],
    y: f64,
}

/// Fits the model and returns a validated artifact ready to be written to disk.
pub fn fit_ridge(
    dataset: &ReferenceDataset,
    options: &RidgeOptions,
) -> Result<ModelArtifact, TrainingError> {
    if dataset.len() < MIN_RECORDS {
        return Err(TrainingError::TooFewRecords {
            found: dataset.len(),
        });
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (index, record) in dataset.records().iter().enumerate() {
        let encoded = record.encode();
        let mut x = [0.0; FEATURE_COUNT];
        x.copy_from_slice(encoded.values());
        let sample = Sample {
            x,
            y: record.monthly_premium.to_f64(),
        };
        if index % TEST_EVERY == 0 {
            test.push(sample);
        } else {
            train.push(sample);
        }
    }

    let n = train.len() as f64;
    let mut means = vec![0.0; FEATURE_COUNT];
    for sample in &train {
        for (j, value) in sample.x.iter().enumerate() {
            means[j] += value / n;
        }
    }
    let mut scales = vec![0.0; FEATURE_COUNT];
    for sample in &train {
        for (j, value) in sample.x.iter().enumerate() {
            scales[j] += (value - means[j]).powi(2) / n;
        }
    }
    for scale in scales.iter_mut() {
        *scale = scale.sqrt();
        if *scale == 0.0 {
            *scale = 1.0;
        }
    }

    let y_mean = train.iter().map(|s| s.y).sum::<f64>() / n;

    // Normal equations: (ZᵀZ + αI) w = Zᵀ(y − ȳ)
    let mut gram = vec![vec![0.0; FEATURE_COUNT]; FEATURE_COUNT];
    let mut rhs = vec![0.0; FEATURE_COUNT];
    for sample in &train {
        let z: Vec<f64> = (0..FEATURE_COUNT)
            .map(|j| (sample.x[j] - means[j]) / scales[j])
            .collect();
        let centered = sample.y - y_mean;
        for i in 0..FEATURE_COUNT {
            rhs[i] += z[i] * centered;
            for j in 0..FEATURE_COUNT {
                gram[i][j] += z[i] * z[j];
            }
        }
    }
    for (i, row) in gram.iter_mut().enumerate() {
        row[i] += options.alpha;
    }
    let weights = solve(gram, rhs).ok_or(TrainingError::Singular)?;

    let scorer = LinearScorer {
        intercept: round_to(y_mean, 6),
        means: means.iter().map(|v| round_to(*v, 6)).collect(),
        scales: scales.iter().map(|v| round_to(*v, 6)).collect(),
        weights: weights.iter().map(|v| round_to(*v, 6)).collect(),
    };

    let metrics = {
        let (train_r2, train_mae, train_rmse) = evaluate(&train, |x| scorer.predict(x));
        let (test_r2, test_mae, test_rmse) = evaluate(&test, |x| scorer.predict(x));
        EvaluationMetrics {
            train_r2: round_to(train_r2, 4),
            test_r2: round_to(test_r2, 4),
            train_mae: round_to(train_mae, 2),
            test_mae: round_to(test_mae, 2),
            train_rmse: round_to(train_rmse, 2),
            test_rmse: round_to(test_rmse, 2),
        }
    };

    let artifact = ModelArtifact {
        model_name: "Ridge Regression".to_string(),
        training_date: options.training_date,
        feature_importance: importance(&scorer.weights),
        scorer: Scorer::Linear(scorer),
        metrics,
        hyperparameters: json!({
            "alpha": options.alpha,
            "standardize": true,
            "test_fraction": 1.0 / TEST_EVERY as f64,
            "split": "every 5th record",
        })
        .as_object()
        .cloned()
        .unwrap_or_default(),
        dataset_info: DatasetInfo {
            total_samples: dataset.len(),
            train_samples: train.len(),
            test_samples: test.len(),
            features: FEATURE_COUNT,
        },
    };

    // Reject anything the server would refuse to load.
    PricingModel::from_artifact(artifact.clone())?;
    Ok(artifact)
}

/// Share of each |standardized weight| in percent, largest first.
fn importance(weights: &[f64]) -> Vec<FeatureImportance> {
    let total: f64 = weights.iter().map(|w| w.abs()).sum();
    let mut ranking: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(weights)
        .map(|(name, weight)| FeatureImportance {
            feature: name.to_string(),
            importance: if total > 0.0 {
                round_to(weight.abs() / total * 100.0, 2)
            } else {
                0.0
            },
        })
        .collect();
    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranking
}

/// (R², MAE, RMSE)
fn evaluate(samples: &[Sample], predict: impl Fn(&[f64]) -> f64) -> (f64, f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| s.y).sum::<f64>() / n;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut abs_err = 0.0;
    for sample in samples {
        let err = sample.y - predict(&sample.x[..]);
        ss_res += err * err;
        ss_tot += (sample.y - mean).powi(2);
        abs_err += err.abs();
    }
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
    (r2, abs_err / n, (ss_res / n).sqrt())
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                let delta = factor * a[col][k];
                a[row][k] -= delta;
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
