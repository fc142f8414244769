//! Binary classification metrics
//!
//! Ratios with a zero denominator are defined as 0. AUC is different: it is
//! left undefined (`None`) when the model produces no scores or the evaluated
//! split holds a single class, rather than being defaulted.

use crate::dataset::Label;
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

/// Confusion counts with label 1 as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(ValidationError::DimensionMismatch {
                expected: actual.len(),
                actual: predicted.len(),
            });
        }
        let mut counts = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a == 1, p == 1) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (true, false) => counts.false_negatives += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    /// Harmonic mean of precision and recall (0 when both are 0)
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Scalar metrics aggregated across folds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricName {
    Accuracy,
    Precision,
    Recall,
    F1,
    Specificity,
    Auc,
}

impl MetricName {
    pub const ALL: [MetricName; 6] = [
        MetricName::Accuracy,
        MetricName::Precision,
        MetricName::Recall,
        MetricName::F1,
        MetricName::Specificity,
        MetricName::Auc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Accuracy => "accuracy",
            MetricName::Precision => "precision",
            MetricName::Recall => "recall",
            MetricName::F1 => "f1",
            MetricName::Specificity => "specificity",
            MetricName::Auc => "auc",
        }
    }
}

/// Evaluation measures for one data split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub specificity: f64,
    pub n_samples: usize,
    pub n_positive: usize,
    pub n_negative: usize,
    pub auc: Option<f64>,
}

impl MetricBundle {
    /// Compute all metrics from true labels, predictions and optional scores
    pub fn compute(actual: &[Label], predicted: &[Label], scores: Option<&[f64]>) -> Result<Self> {
        let counts = ConfusionCounts::from_labels(actual, predicted)?;
        let auc = match scores {
            Some(scores) if scores.len() == actual.len() => roc_auc(actual, scores),
            Some(scores) => {
                return Err(ValidationError::DimensionMismatch {
                    expected: actual.len(),
                    actual: scores.len(),
                })
            }
            None => None,
        };
        Ok(Self::from_counts(&counts, auc))
    }

    pub fn from_counts(counts: &ConfusionCounts, auc: Option<f64>) -> Self {
        let n_positive = counts.true_positives + counts.false_negatives;
        let n_samples = counts.total();
        Self {
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
            specificity: counts.specificity(),
            n_samples,
            n_positive,
            n_negative: n_samples - n_positive,
            auc,
        }
    }

    /// Value of one scalar metric (`None` only for undefined AUC)
    pub fn get(&self, metric: MetricName) -> Option<f64> {
        match metric {
            MetricName::Accuracy => Some(self.accuracy),
            MetricName::Precision => Some(self.precision),
            MetricName::Recall => Some(self.recall),
            MetricName::F1 => Some(self.f1),
            MetricName::Specificity => Some(self.specificity),
            MetricName::Auc => self.auc,
        }
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic
///
/// Tied scores receive their average rank. Returns `None` when either class
/// is absent or any score is non-finite.
pub fn roc_auc(actual: &[Label], scores: &[f64]) -> Option<f64> {
    if actual.len() != scores.len() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let n_pos = actual.iter().filter(|&&l| l == 1).count();
    let n_neg = actual.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0f64; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; tied block [start, end) shares the mean rank
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = actual
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
