//! Plausibility checks for validation results
//!
//! Near-perfect test scores are red flags; a wide train-test gap or a nearly
//! single-class test split are warnings. Thresholds come from
//! [`AnalyzerThresholds`].

use crate::config::AnalyzerThresholds;
use crate::validator::ValidationResult;
use serde::{Deserialize, Serialize};

const RED_FLAG_RECOMMENDATIONS: [&str; 4] = [
    "Check for data leakage between train/test sets",
    "Verify patient-independent validation",
    "Review preprocessing pipeline for future information",
    "Consider simpler baseline models",
];

const WARNING_RECOMMENDATIONS: [&str; 3] = [
    "Use stratified sampling to maintain class balance",
    "Apply stronger regularization to reduce overfitting",
    "Collect more data from underrepresented class",
];

/// Findings for one validation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub red_flags: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// False when any red flag was raised
    pub is_realistic: bool,
}

impl Analysis {
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        if self.is_realistic {
            report.push_str("✅ RESULTS LOOK REALISTIC\n");
        } else {
            report.push_str(&format!(
                "❌ UNREALISTIC RESULTS ({} red flags)\n",
                self.red_flags.len()
            ));
        }

        if !self.red_flags.is_empty() {
            report.push_str("\nRed flags:\n");
            for flag in &self.red_flags {
                report.push_str(&format!("  - {}\n", flag));
            }
        }

        if !self.warnings.is_empty() {
            report.push_str("\n⚠️  Warnings:\n");
            for warning in &self.warnings {
                report.push_str(&format!("  - {}\n", warning));
            }
        }

        if !self.recommendations.is_empty() {
            report.push_str("\nRecommendations:\n");
            for rec in &self.recommendations {
                report.push_str(&format!("  - {}\n", rec));
            }
        }

        report
    }
}

/// Stateless rule engine over a single [`ValidationResult`]
#[derive(Debug, Clone, Default)]
pub struct ResultAnalyzer {
    thresholds: AnalyzerThresholds,
}

impl ResultAnalyzer {
    pub fn new(thresholds: AnalyzerThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AnalyzerThresholds {
        &self.thresholds
    }

    /// Inspect test metrics, the train-test gap and test class balance
    pub fn analyze(&self, result: &ValidationResult) -> Analysis {
        let t = &self.thresholds;
        let test = &result.test;
        let mut red_flags = Vec::new();
        let mut warnings = Vec::new();

        if test.accuracy >= t.max_plausible_accuracy {
            red_flags.push(format!("Suspiciously high accuracy: {:.3}", test.accuracy));
        }

        let auc = test.auc.unwrap_or(0.0);
        if auc >= t.max_plausible_auc {
            red_flags.push(format!("Suspiciously high AUC: {:.3}", auc));
        }

        let gap = result.train.accuracy - test.accuracy;
        if gap > t.max_train_test_gap {
            warnings.push(format!(
                "Large train-test accuracy gap: {:.3} (possible overfitting)",
                gap
            ));
        }

        // min over both labels, not just the present ones: a single-class
        // test split scores 0 and warns
        let minority = if test.n_samples == 0 {
            0.0
        } else {
            test.n_positive.min(test.n_negative) as f64 / test.n_samples as f64
        };
        if minority < t.min_minority_fraction {
            warnings.push(format!(
                "Severe class imbalance in test set: {:.3}",
                minority
            ));
        }

        let mut recommendations = Vec::new();
        if !red_flags.is_empty() {
            recommendations.extend(RED_FLAG_RECOMMENDATIONS.iter().map(|s| s.to_string()));
        }
        if !warnings.is_empty() {
            recommendations.extend(WARNING_RECOMMENDATIONS.iter().map(|s| s.to_string()));
        }

        for flag in &red_flags {
            tracing::warn!("Red flag: {}", flag);
        }

        Analysis {
            is_realistic: red_flags.is_empty(),
            red_flags,
            warnings,
            recommendations,
        }
    }
}
