//! Cross-validation aggregation
//!
//! Per-metric mean and population standard deviation over completed folds
//! are computed in f64 with statrs. With two or more defined values a
//! two-sided 95% interval is built from Student-t with `n - 1` degrees of
//! freedom and the sample standard error.

use crate::cross_validation::{FoldOutcome, FoldResult};
use crate::metrics::MetricName;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Summary of one metric across folds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub values: Vec<f64>,
    /// 95% confidence interval, present with at least two values
    pub ci95: Option<(f64, f64)>,
}

/// Count metrics summed over completed folds' test splits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTotals {
    pub n_samples_total: usize,
    pub n_positive_total: usize,
    pub n_negative_total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CvStatus {
    Complete,
    /// No fold completed; metrics are empty
    Insufficient { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFold {
    pub fold: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFold {
    pub fold: usize,
    pub error: String,
}

/// Aggregated cross-validation outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCvResult {
    pub status: CvStatus,
    pub n_folds_requested: usize,
    /// Folds actually planned after clamping to the group count
    pub n_folds_planned: usize,
    pub n_folds_completed: usize,
    pub metrics: BTreeMap<MetricName, MetricSummary>,
    pub totals: CountTotals,
    pub folds: Vec<FoldResult>,
    pub skipped: Vec<SkippedFold>,
    pub failed: Vec<FailedFold>,
}

impl AggregatedCvResult {
    /// Degenerate result with no completed folds
    pub fn insufficient(n_folds_requested: usize, reason: impl Into<String>) -> Self {
        Self {
            status: CvStatus::Insufficient {
                reason: reason.into(),
            },
            n_folds_requested,
            n_folds_planned: 0,
            n_folds_completed: 0,
            metrics: BTreeMap::new(),
            totals: CountTotals::default(),
            folds: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self.status, CvStatus::Insufficient { .. })
    }

    pub fn metric(&self, name: MetricName) -> Option<&MetricSummary> {
        self.metrics.get(&name)
    }

    /// Multi-line report of per-metric statistics and fold bookkeeping
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(
            report,
            "Cross-validation: {}/{} folds completed ({} requested)",
            self.n_folds_completed, self.n_folds_planned, self.n_folds_requested
        );

        if let CvStatus::Insufficient { reason } = &self.status {
            let _ = writeln!(report, "INSUFFICIENT: {}", reason);
        }

        for (name, summary) in &self.metrics {
            let _ = write!(
                report,
                "  {:<12} {:.4} ± {:.4}",
                name.as_str(),
                summary.mean,
                summary.std
            );
            if let Some((lo, hi)) = summary.ci95 {
                let _ = write!(report, "  95% CI [{:.4}, {:.4}]", lo, hi);
            }
            let _ = writeln!(report, "  (n={})", summary.values.len());
        }

        if self.n_folds_completed > 0 {
            let _ = writeln!(
                report,
                "  test samples: {} ({} positive, {} negative)",
                self.totals.n_samples_total,
                self.totals.n_positive_total,
                self.totals.n_negative_total
            );
        }
        for skipped in &self.skipped {
            let _ = writeln!(report, "  fold {} skipped: {}", skipped.fold, skipped.reason);
        }
        for failed in &self.failed {
            let _ = writeln!(report, "  fold {} failed: {}", failed.fold, failed.error);
        }
        report
    }
}

/// Mean, population std and 95% CI of one metric's defined values
///
/// Returns `None` for an empty slice or non-finite statistics.
pub fn summarize(values: &[f64]) -> Option<MetricSummary> {
    if values.is_empty() {
        return None;
    }

    let mean = values.iter().mean();
    let std = if values.len() > 1 {
        values.iter().population_std_dev()
    } else {
        0.0
    };
    if !mean.is_finite() || !std.is_finite() {
        return None;
    }

    Some(MetricSummary {
        mean,
        std,
        values: values.to_vec(),
        ci95: confidence_interval(mean, std, values.len()),
    })
}

/// Student-t interval from the population std of `n` values
fn confidence_interval(mean: f64, population_std: f64, n: usize) -> Option<(f64, f64)> {
    if n < 2 {
        return None;
    }
    // sample std / sqrt(n) == population std / sqrt(n - 1)
    let sem = population_std / ((n - 1) as f64).sqrt();
    if sem == 0.0 {
        return Some((mean, mean));
    }
    let t = StudentsT::new(0.0, 1.0, (n - 1) as f64).ok()?;
    let margin = t.inverse_cdf(0.975) * sem;
    Some((mean - margin, mean + margin))
}

/// Fold outcomes (in fold order) into an aggregated result
pub fn aggregate(mut outcomes: Vec<FoldOutcome>, n_folds_requested: usize) -> AggregatedCvResult {
    outcomes.sort_by_key(FoldOutcome::fold);
    let n_folds_planned = outcomes.len();

    let mut folds = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome {
            FoldOutcome::Completed(result) => folds.push(result),
            FoldOutcome::Skipped { fold, reason } => skipped.push(SkippedFold { fold, reason }),
            FoldOutcome::Failed { fold, error } => failed.push(FailedFold { fold, error }),
        }
    }

    if folds.is_empty() {
        let reason = if n_folds_planned == 0 {
            "no folds could be planned".to_string()
        } else {
            format!(
                "0 of {} folds completed ({} skipped, {} failed)",
                n_folds_planned,
                skipped.len(),
                failed.len()
            )
        };
        tracing::warn!("Cross-validation insufficient: {}", reason);
        return AggregatedCvResult {
            n_folds_planned,
            skipped,
            failed,
            ..AggregatedCvResult::insufficient(n_folds_requested, reason)
        };
    }

    let mut metrics = BTreeMap::new();
    for name in MetricName::ALL {
        let values: Vec<f64> = folds
            .iter()
            .filter_map(|f| f.result.test.get(name))
            .filter(|v| v.is_finite())
            .collect();
        if let Some(summary) = summarize(&values) {
            metrics.insert(name, summary);
        }
    }

    let mut totals = CountTotals::default();
    for fold in &folds {
        totals.n_samples_total += fold.result.test.n_samples;
        totals.n_positive_total += fold.result.test.n_positive;
        totals.n_negative_total += fold.result.test.n_negative;
    }

    AggregatedCvResult {
        status: CvStatus::Complete,
        n_folds_requested,
        n_folds_planned,
        n_folds_completed: folds.len(),
        metrics,
        totals,
        folds,
        skipped,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_reference_accuracies() {
        let summary = summarize(&[0.70, 0.75, 0.80, 0.72, 0.78]).unwrap();
        assert!((summary.mean - 0.75).abs() < 1e-5);
        // population variance 0.00136
        assert!((summary.std - 0.00136f64.sqrt()).abs() < 1e-4);
        let (lo, hi) = summary.ci95.unwrap();
        assert!(lo < summary.mean && summary.mean < hi);
        // t(0.975, 4) = 2.776, sem = 0.01844
        assert!((hi - summary.mean - 0.0512).abs() < 1e-3);
        assert!((summary.mean - lo - 0.0512).abs() < 1e-3);
    }

    #[test]
    fn test_summarize_single_value_has_no_interval() {
        let summary = summarize(&[0.8]).unwrap();
        assert_eq!(summary.mean, 0.8);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.ci95, None);
    }

    #[test]
    fn test_summarize_keeps_f64_precision() {
        let summary = summarize(&[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(summary.mean, 0.1);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.ci95, Some((0.1, 0.1)));

        // 1e-9 apart is below f32 resolution at this magnitude
        let summary = summarize(&[0.9, 0.900000001]).unwrap();
        assert!(summary.mean > 0.9);
        assert!(summary.std > 0.0);
        assert!((summary.std - 0.5e-9).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_constant_values_collapse_interval() {
        let summary = summarize(&[0.5, 0.5, 0.5]).unwrap();
        assert_eq!(summary.std, 0.0);
        let (lo, hi) = summary.ci95.unwrap();
        assert_eq!(lo, summary.mean);
        assert_eq!(hi, summary.mean);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn test_aggregate_without_completed_folds_is_insufficient() {
        let outcomes = vec![
            FoldOutcome::Skipped {
                fold: 1,
                reason: "insufficient training groups".to_string(),
            },
            FoldOutcome::Failed {
                fold: 0,
                error: "boom".to_string(),
            },
        ];
        let result = aggregate(outcomes, 2);
        assert!(result.is_insufficient());
        assert_eq!(result.n_folds_planned, 2);
        assert_eq!(result.n_folds_completed, 0);
        assert!(result.metrics.is_empty());
        assert_eq!(result.skipped[0].fold, 1);
        assert_eq!(result.failed[0].fold, 0);
        assert!(result.to_report_string().contains("INSUFFICIENT"));
    }

    #[test]
    fn test_aggregate_no_plans() {
        let result = aggregate(Vec::new(), 5);
        assert!(result.is_insufficient());
        assert_eq!(result.n_folds_requested, 5);
    }
}
