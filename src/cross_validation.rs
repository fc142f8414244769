//! Group-disjoint K-fold orchestration
//!
//! All fold partitions are planned before any work is dispatched. Ready
//! folds are fed through a channel to a bounded set of scoped worker
//! threads; each worker builds a fresh model from the factory and reports
//! exactly one [`FoldOutcome`] per fold. Panics inside a fold are caught and
//! reported as failures.

use crate::aggregate::{aggregate, AggregatedCvResult};
use crate::config::ValidationConfig;
use crate::dataset::GroupStore;
use crate::error::{Result, ValidationError};
use crate::model::ModelFactory;
use crate::split::{FoldPartition, FoldPlan, GroupSplitter, SplitAssignment};
use crate::validator::{GroupValidator, ValidationResult};
use crossbeam::channel;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// Result of one completed fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub result: ValidationResult,
}

/// Explicit per-fold outcome
#[derive(Debug, Clone, PartialEq)]
pub enum FoldOutcome {
    Completed(FoldResult),
    Skipped { fold: usize, reason: String },
    Failed { fold: usize, error: String },
}

impl FoldOutcome {
    pub fn fold(&self) -> usize {
        match self {
            FoldOutcome::Completed(result) => result.fold,
            FoldOutcome::Skipped { fold, .. } | FoldOutcome::Failed { fold, .. } => *fold,
        }
    }
}

pub struct CrossValidator {
    validator: GroupValidator,
}

impl CrossValidator {
    pub fn new(config: ValidationConfig) -> Result<Self> {
        Ok(Self {
            validator: GroupValidator::new(config)?,
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        self.validator.config()
    }

    /// Run K-fold cross-validation with the configured fold count
    ///
    /// Never fails: planning errors and zero completed folds both yield an
    /// insufficient result.
    pub fn run(&self, factory: &ModelFactory, store: &GroupStore) -> AggregatedCvResult {
        let config = self.validator.config();
        let n_folds = config.n_folds;

        let plans = match GroupSplitter::new(config.seed).k_fold(&store.ids(), n_folds) {
            Ok(plans) => plans,
            Err(e) => {
                tracing::warn!("Fold planning failed: {}", e);
                return AggregatedCvResult::insufficient(n_folds, e.to_string());
            }
        };

        let mut outcomes = Vec::with_capacity(plans.len());
        let mut ready = Vec::new();
        for FoldPlan { index, partition } in plans {
            match partition {
                FoldPartition::Ready(assignment) => ready.push((index, assignment)),
                FoldPartition::Skipped { reason } => {
                    tracing::warn!("Fold {}: skipped ({})", index + 1, reason);
                    outcomes.push(FoldOutcome::Skipped {
                        fold: index,
                        reason,
                    });
                }
            }
        }

        let workers = config.effective_workers().min(ready.len()).max(1);
        tracing::info!(
            "Running {} folds on {} worker(s) ({} skipped)",
            ready.len(),
            workers,
            outcomes.len()
        );

        if workers == 1 {
            for (index, assignment) in &ready {
                outcomes.push(self.run_fold(factory, store, *index, assignment));
            }
        } else {
            outcomes.extend(self.run_parallel(factory, store, ready, workers));
        }

        aggregate(outcomes, n_folds)
    }

    fn run_parallel(
        &self,
        factory: &ModelFactory,
        store: &GroupStore,
        ready: Vec<(usize, SplitAssignment)>,
        workers: usize,
    ) -> Vec<FoldOutcome> {
        let expected: Vec<usize> = ready.iter().map(|(index, _)| *index).collect();
        let (job_tx, job_rx) = channel::unbounded::<(usize, SplitAssignment)>();
        let (out_tx, out_rx) = channel::unbounded::<FoldOutcome>();
        for job in ready {
            // receiver is alive until the scope below ends
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let scope_result = crossbeam::thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let out_tx = out_tx.clone();
                s.spawn(move |_| {
                    for (index, assignment) in job_rx.iter() {
                        let outcome = self.run_fold(factory, store, index, &assignment);
                        if out_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(out_tx);

        if scope_result.is_err() {
            tracing::warn!("A fold worker thread panicked outside fold execution");
        }

        let mut outcomes: Vec<FoldOutcome> = out_rx.iter().collect();
        // every dispatched fold must report, even if its worker died
        for index in expected {
            if !outcomes.iter().any(|o| o.fold() == index) {
                outcomes.push(FoldOutcome::Failed {
                    fold: index,
                    error: "worker exited before reporting".to_string(),
                });
            }
        }
        outcomes
    }

    /// Execute one fold, converting errors and panics into outcomes
    fn run_fold(
        &self,
        factory: &ModelFactory,
        store: &GroupStore,
        index: usize,
        assignment: &SplitAssignment,
    ) -> FoldOutcome {
        tracing::info!(
            "Fold {}: train={} val={} test={} groups",
            index + 1,
            assignment.train().len(),
            assignment.val().len(),
            assignment.test().len()
        );

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut model = factory();
            self.validator.validate(model.as_mut(), store, assignment)
        }));

        match attempt {
            Ok(Ok(result)) => {
                tracing::info!(
                    "Fold {}: test acc={:.3}, f1={:.3}",
                    index + 1,
                    result.test.accuracy,
                    result.test.f1
                );
                FoldOutcome::Completed(FoldResult {
                    fold: index,
                    result,
                })
            }
            Ok(Err(ValidationError::EmptySplit { split, reason })) => {
                let reason = format!("{} split empty: {}", split, reason);
                tracing::warn!("Fold {}: skipped ({})", index + 1, reason);
                FoldOutcome::Skipped {
                    fold: index,
                    reason,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Fold {}: failed: {}", index + 1, e);
                FoldOutcome::Failed {
                    fold: index,
                    error: e.to_string(),
                }
            }
            Err(payload) => {
                let error = panic_message(payload.as_ref());
                tracing::warn!("Fold {}: panicked: {}", index + 1, error);
                FoldOutcome::Failed { fold: index, error }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with non-string payload".to_string()
    }
}
