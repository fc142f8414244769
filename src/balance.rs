//! Synthetic minority oversampling for the train pool
//!
//! Each synthetic example interpolates a random minority example toward one
//! of its nearest minority-class neighbors:
//!
//! ```text
//! x_new = x + gap * (x_neighbor - x),  gap ~ U[0, 1)
//! ```
//!
//! Majority rows are never added, removed or altered. Synthetic rows are
//! appended after the original rows. Any problem (single class, too few
//! minority examples, non-finite values) returns the original data with a
//! status explaining why; balancing never aborts a run.
//!
//! # References
//!
//! Chawla, N. V., Bowyer, K. W., Hall, L. O., & Kegelmeyer, W. P. (2002).
//! SMOTE: Synthetic Minority Over-sampling Technique. JAIR 16, 321-357.

use crate::config::BalanceConfig;
use crate::dataset::{ClassCounts, Dataset, Label};
use crate::error::{Result, ValidationError};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// What the balancer did to the train pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceStatus {
    /// Oversampling ran and appended `synthesized` minority rows
    Applied { synthesized: usize },
    /// Preconditions not met; data returned unchanged
    Skipped { reason: String },
    /// Oversampling failed internally; data returned unchanged
    Failed { reason: String },
    /// Balancing turned off by configuration
    Disabled,
}

impl BalanceStatus {
    pub fn applied(&self) -> bool {
        matches!(self, BalanceStatus::Applied { .. })
    }
}

/// Balanced train pool plus the status that produced it
#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub data: Dataset,
    pub status: BalanceStatus,
}

impl BalanceOutcome {
    fn unchanged(data: &Dataset, status: BalanceStatus) -> Self {
        Self {
            data: data.clone(),
            status,
        }
    }
}

/// Seeded minority oversampler
#[derive(Debug, Clone)]
pub struct ClassBalancer {
    ratio: f64,
    k_neighbors: usize,
    seed: u64,
}

impl ClassBalancer {
    pub fn new(ratio: f64, k_neighbors: usize, seed: u64) -> Result<Self> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ValidationError::InvalidConfig(format!(
                "balance ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        if k_neighbors == 0 {
            return Err(ValidationError::InvalidConfig(
                "k_neighbors must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            ratio,
            k_neighbors,
            seed,
        })
    }

    pub fn from_config(config: &BalanceConfig, seed: u64) -> Result<Self> {
        Self::new(config.ratio, config.k_neighbors, seed)
    }

    /// Oversample the minority class of `train` toward the target ratio
    pub fn balance(&self, train: &Dataset) -> BalanceOutcome {
        let counts = train.class_counts();

        if counts.distinct() < 2 {
            tracing::warn!("Only one class present, skipping oversampling");
            return BalanceOutcome::unchanged(
                train,
                BalanceStatus::Skipped {
                    reason: "only one class present".to_string(),
                },
            );
        }

        let (minority_label, n_minority, n_majority) = minority_of(&counts);
        if n_minority < 2 {
            tracing::warn!("Not enough minority samples for oversampling ({})", n_minority);
            return BalanceOutcome::unchanged(
                train,
                BalanceStatus::Skipped {
                    reason: format!("only {} minority examples", n_minority),
                },
            );
        }

        let target = (self.ratio * n_majority as f64).floor() as usize;
        if target <= n_minority {
            return BalanceOutcome::unchanged(
                train,
                BalanceStatus::Skipped {
                    reason: format!(
                        "minority:majority {}:{} already meets ratio {}",
                        n_minority, n_majority, self.ratio
                    ),
                },
            );
        }

        let n_synthetic = target - n_minority;
        match self.synthesize(train, minority_label, n_synthetic) {
            Ok(data) => {
                tracing::info!(
                    "Oversampling applied: {:?} -> {:?}",
                    counts,
                    data.class_counts()
                );
                BalanceOutcome {
                    data,
                    status: BalanceStatus::Applied {
                        synthesized: n_synthetic,
                    },
                }
            }
            Err(reason) => {
                tracing::warn!("Oversampling failed: {}, using original data", reason);
                BalanceOutcome::unchanged(train, BalanceStatus::Failed { reason })
            }
        }
    }

    fn synthesize(
        &self,
        train: &Dataset,
        minority_label: Label,
        n_synthetic: usize,
    ) -> std::result::Result<Dataset, String> {
        let minority: Vec<&[f32]> = train
            .features
            .rows()
            .zip(&train.labels)
            .filter(|(_, &label)| label == minority_label)
            .map(|(row, _)| row)
            .collect();

        if minority.iter().any(|row| row.iter().any(|v| !v.is_finite())) {
            return Err("non-finite values in minority examples".to_string());
        }

        let k = self.k_neighbors.min(minority.len() - 1);
        let neighbors = nearest_neighbors(&minority, k);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut features = train.features.clone();
        let mut labels = train.labels.clone();
        let mut synthetic = vec![0.0f32; train.n_features()];

        for _ in 0..n_synthetic {
            let i = rng.gen_range(0..minority.len());
            let j = neighbors[i][rng.gen_range(0..k)];
            let gap: f32 = rng.gen();

            for (out, (&a, &b)) in synthetic.iter_mut().zip(minority[i].iter().zip(minority[j])) {
                *out = a + gap * (b - a);
            }
            if synthetic.iter().any(|v| !v.is_finite()) {
                return Err("interpolation produced non-finite values".to_string());
            }

            features.push_row(&synthetic).map_err(|e| e.to_string())?;
            labels.push(minority_label);
        }

        Dataset::new(features, labels).map_err(|e| e.to_string())
    }
}

/// (minority label, minority count, majority count); ties favor label 1 as minority
fn minority_of(counts: &ClassCounts) -> (Label, usize, usize) {
    if counts.positive <= counts.negative {
        (1, counts.positive, counts.negative)
    } else {
        (0, counts.negative, counts.positive)
    }
}

/// Indices of the `k` nearest other rows (squared Euclidean) for every row
fn nearest_neighbors(rows: &[&[f32]], k: usize) -> Vec<Vec<usize>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let mut distances: Vec<(f32, usize)> = rows
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, other)| (squared_distance(row, other), j))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
