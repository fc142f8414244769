//! Train-only feature scaling
//!
//! Uses aprender's `StandardScaler`. The scaler is fitted on the train pool
//! and never sees validation or test rows; those pools only go through
//! `transform`. Non-finite inputs are rejected in both steps.

use crate::dataset::{Dataset, FeatureMatrix};
use crate::error::{Result, ValidationError};
use aprender::preprocessing::StandardScaler;
use aprender::primitives::Matrix;
use aprender::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Fitted per-feature scaling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub means: Vec<f32>,
    pub stds: Vec<f32>,
}

/// Standardization fitted on the train pool
pub struct Preprocessor {
    scaler: StandardScaler,
    params: ScalingParams,
}

impl Preprocessor {
    /// Fit mean/std scaling on the train pool only
    pub fn fit(train: &Dataset) -> Result<Self> {
        if train.is_empty() {
            return Err(ValidationError::EmptySplit {
                split: "train".to_string(),
                reason: "cannot fit scaling on zero examples".to_string(),
            });
        }
        ensure_finite(&train.features)?;

        let matrix = to_matrix(&train.features)?;
        let mut scaler = StandardScaler::new().with_mean(true).with_std(true);
        scaler
            .fit(&matrix)
            .map_err(|e| ValidationError::Preprocessing(e.to_string()))?;

        let params = ScalingParams {
            means: scaler.mean().to_vec(),
            stds: scaler.std().to_vec(),
        };
        tracing::debug!(
            "Fitted scaler on {} train rows ({} features)",
            train.len(),
            params.means.len()
        );

        Ok(Self { scaler, params })
    }

    pub fn params(&self) -> &ScalingParams {
        &self.params
    }

    /// Apply the fitted transform; features constant in train map to 0
    pub fn transform(&self, data: &Dataset) -> Result<Dataset> {
        if data.n_features() != self.params.means.len() {
            return Err(ValidationError::DimensionMismatch {
                expected: self.params.means.len(),
                actual: data.n_features(),
            });
        }
        ensure_finite(&data.features)?;

        let matrix = to_matrix(&data.features)?;
        let scaled = self
            .scaler
            .transform(&matrix)
            .map_err(|e| ValidationError::Preprocessing(e.to_string()))?;

        let constant: Vec<bool> = self
            .params
            .stds
            .iter()
            .map(|&s| s <= 1e-10 || !s.is_finite())
            .collect();
        let (n_rows, n_cols) = scaled.shape();
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for i in 0..n_rows {
            for (j, &is_constant) in constant.iter().enumerate().take(n_cols) {
                values.push(if is_constant { 0.0 } else { scaled.get(i, j) });
            }
        }

        Dataset::new(
            FeatureMatrix::from_flat(n_rows, n_cols, values)?,
            data.labels.clone(),
        )
    }
}

fn ensure_finite(features: &FeatureMatrix) -> Result<()> {
    let n_cols = features.n_cols().max(1);
    match features.as_slice().iter().position(|v| !v.is_finite()) {
        Some(pos) => Err(ValidationError::Preprocessing(format!(
            "non-finite feature value at row {}, column {}",
            pos / n_cols,
            pos % n_cols
        ))),
        None => Ok(()),
    }
}

fn to_matrix(features: &FeatureMatrix) -> Result<Matrix<f32>> {
    Matrix::from_vec(
        features.n_rows(),
        features.n_cols(),
        features.as_slice().to_vec(),
    )
    .map_err(|e| ValidationError::Preprocessing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(rows: &[Vec<f32>]) -> Dataset {
        let labels = vec![0; rows.len()];
        Dataset::new(FeatureMatrix::from_rows(rows).unwrap(), labels).unwrap()
    }

    #[test]
    fn test_fit_transform_centers_train() {
        let train = dataset(&[vec![1.0, 10.0], vec![3.0, 20.0], vec![5.0, 30.0]]);
        let pre = Preprocessor::fit(&train).unwrap();
        assert!((pre.params().means[0] - 3.0).abs() < 1e-5);
        assert!((pre.params().means[1] - 20.0).abs() < 1e-5);

        let scaled = pre.transform(&train).unwrap();
        let col0: f32 = scaled.features.rows().map(|r| r[0]).sum();
        assert!(col0.abs() < 1e-4);
        assert!(scaled.features.row(0)[0] < 0.0);
        assert!(scaled.features.row(2)[0] > 0.0);
    }

    #[test]
    fn test_params_ignore_holdout_data() {
        let train = dataset(&[vec![1.0], vec![2.0], vec![3.0]]);
        let pre = Preprocessor::fit(&train).unwrap();
        let before = pre.params().clone();

        let test = dataset(&[vec![1000.0], vec![-500.0]]);
        let scaled = pre.transform(&test).unwrap();
        assert_eq!(pre.params(), &before);
        assert!(scaled.features.row(0)[0] > 100.0);
    }

    #[test]
    fn test_transform_keeps_labels() {
        let train = dataset(&[vec![1.0], vec![2.0]]);
        let pre = Preprocessor::fit(&train).unwrap();
        let other = Dataset::new(FeatureMatrix::from_rows(&[vec![5.0]]).unwrap(), vec![1]).unwrap();
        assert_eq!(pre.transform(&other).unwrap().labels, vec![1]);
    }

    #[test]
    fn test_constant_feature_is_finite() {
        let train = dataset(&[vec![2.0, 1.0], vec![2.0, 3.0]]);
        let pre = Preprocessor::fit(&train).unwrap();
        let scaled = pre.transform(&train).unwrap();
        assert!(scaled.features.as_slice().iter().all(|v| v.is_finite()));
        assert!(scaled.features.rows().all(|r| r[0] == 0.0));

        // off-center holdout values in a constant column still map to 0
        let test = dataset(&[vec![7.0, 5.0]]);
        let scaled = pre.transform(&test).unwrap();
        assert_eq!(scaled.features.row(0)[0], 0.0);
        assert!(scaled.features.row(0)[1] > 0.0);
    }

    #[test]
    fn test_non_finite_holdout_rejected() {
        let pre = Preprocessor::fit(&dataset(&[vec![1.0, 2.0], vec![3.0, 4.0]])).unwrap();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let test = dataset(&[vec![1.0, 2.0], vec![2.0, bad]]);
            match pre.transform(&test) {
                Err(ValidationError::Preprocessing(msg)) => {
                    assert!(msg.contains("row 1, column 1"), "{}", msg)
                }
                other => panic!("expected preprocessing error, got {:?}", other.map(|d| d.len())),
            }
        }
    }

    #[test]
    fn test_non_finite_train_rejected() {
        let train = dataset(&[vec![1.0], vec![f32::NAN]]);
        assert!(matches!(
            Preprocessor::fit(&train),
            Err(ValidationError::Preprocessing(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let pre = Preprocessor::fit(&dataset(&[vec![1.0, 2.0], vec![2.0, 1.0]])).unwrap();
        assert!(matches!(
            pre.transform(&dataset(&[vec![1.0]])),
            Err(ValidationError::DimensionMismatch { .. })
        ));
    }
}
