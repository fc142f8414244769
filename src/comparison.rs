//! Side-by-side evaluation of several models on one split
//!
//! A model that fails is reported in its row and does not stop the others.

use crate::dataset::GroupStore;
use crate::model::ModelFactory;
use crate::split::SplitAssignment;
use crate::validator::{GroupValidator, RunHistory};
use serde::{Deserialize, Serialize};

/// Test-split metrics of one model, or why it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonRow {
    Scored {
        model: String,
        accuracy: f64,
        precision: f64,
        recall: f64,
        f1: f64,
        specificity: f64,
        auc: Option<f64>,
        n_test_samples: usize,
        n_test_positive: usize,
    },
    Failed {
        model: String,
        error: String,
    },
}

impl ComparisonRow {
    pub fn model(&self) -> &str {
        match self {
            ComparisonRow::Scored { model, .. } | ComparisonRow::Failed { model, .. } => model,
        }
    }

    pub fn f1(&self) -> Option<f64> {
        match self {
            ComparisonRow::Scored { f1, .. } => Some(*f1),
            ComparisonRow::Failed { .. } => None,
        }
    }
}

/// Validate every named model on the same assignment
///
/// Successful results are appended to `history` in the order given.
pub fn compare_models(
    validator: &GroupValidator,
    store: &GroupStore,
    assignment: &SplitAssignment,
    models: &[(&str, &ModelFactory)],
    history: &mut RunHistory,
) -> Vec<ComparisonRow> {
    models
        .iter()
        .map(|(name, factory)| {
            let mut model = factory();
            match validator.validate_into(model.as_mut(), store, assignment, history) {
                Ok(result) => {
                    let test = &result.test;
                    ComparisonRow::Scored {
                        model: name.to_string(),
                        accuracy: test.accuracy,
                        precision: test.precision,
                        recall: test.recall,
                        f1: test.f1,
                        specificity: test.specificity,
                        auc: test.auc,
                        n_test_samples: test.n_samples,
                        n_test_positive: test.n_positive,
                    }
                }
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", name, e);
                    ComparisonRow::Failed {
                        model: name.to_string(),
                        error: e.to_string(),
                    }
                }
            }
        })
        .collect()
}

/// Row with the highest test F1 (first one on ties)
pub fn best_by_f1(rows: &[ComparisonRow]) -> Option<&ComparisonRow> {
    rows.iter().fold(None, |best: Option<&ComparisonRow>, row| {
        match (best.and_then(ComparisonRow::f1), row.f1()) {
            (_, None) => best,
            (None, Some(_)) => Some(row),
            (Some(b), Some(f)) if f > b => Some(row),
            _ => best,
        }
    })
}

/// Fixed-width text table of comparison rows
pub fn comparison_table(rows: &[ComparisonRow]) -> String {
    let mut table = format!(
        "{:<24} {:>8} {:>9} {:>8} {:>8} {:>11} {:>8}\n",
        "model", "accuracy", "precision", "recall", "f1", "specificity", "auc"
    );
    for row in rows {
        match row {
            ComparisonRow::Scored {
                model,
                accuracy,
                precision,
                recall,
                f1,
                specificity,
                auc,
                ..
            } => {
                let auc = auc.map_or_else(|| "n/a".to_string(), |a| format!("{:.4}", a));
                table.push_str(&format!(
                    "{:<24} {:>8.4} {:>9.4} {:>8.4} {:>8.4} {:>11.4} {:>8}\n",
                    model, accuracy, precision, recall, f1, specificity, auc
                ));
            }
            ComparisonRow::Failed { model, error } => {
                table.push_str(&format!("{:<24} error: {}\n", model, error));
            }
        }
    }
    table
}
