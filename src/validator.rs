//! Single-run group-independent validation
//!
//! The stages run strictly in order: assemble the pools for an assignment,
//! fit scaling on train, oversample the scaled train pool, fit the model
//! once, then score train (the balanced data the model saw), val and test
//! (original class balance, train-fitted scaling).

use crate::assemble::DatasetAssembler;
use crate::balance::{BalanceStatus, ClassBalancer};
use crate::config::ValidationConfig;
use crate::dataset::{ClassCounts, Dataset, GroupStore};
use crate::error::{Result, ValidationError};
use crate::metrics::MetricBundle;
use crate::model::{Classifier, ModelIdentity};
use crate::preprocess::{Preprocessor, ScalingParams};
use crate::split::{GroupSplitter, SplitAssignment};
use serde::{Deserialize, Serialize};

/// Class counts before and after balancing, plus the test split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub train_original: ClassCounts,
    pub train_balanced: ClassCounts,
    pub test: ClassCounts,
}

/// Provenance of one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetadata {
    pub model: ModelIdentity,
    pub train_groups: Vec<String>,
    pub val_groups: Vec<String>,
    pub test_groups: Vec<String>,
    pub balancing_applied: bool,
    pub balance_status: BalanceStatus,
    pub class_distribution: ClassDistribution,
    /// Scaling parameters fitted on the train pool
    pub scaling: ScalingParams,
}

/// Metrics for all three splits of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub train: MetricBundle,
    pub val: MetricBundle,
    pub test: MetricBundle,
    pub metadata: ValidationMetadata,
}

impl ValidationResult {
    /// One-line human-readable summary of the test metrics
    pub fn summary_line(&self) -> String {
        let auc = self
            .test
            .auc
            .map_or_else(|| "n/a".to_string(), |a| format!("{:.3}", a));
        format!(
            "{}: test acc={:.3} prec={:.3} rec={:.3} f1={:.3} spec={:.3} auc={} (n={}, pos={})",
            self.metadata.model.name,
            self.test.accuracy,
            self.test.precision,
            self.test.recall,
            self.test.f1,
            self.test.specificity,
            auc,
            self.test.n_samples,
            self.test.n_positive
        )
    }
}

/// Caller-owned log of validation results
#[derive(Debug, Clone, Default)]
pub struct RunHistory {
    results: Vec<ValidationResult>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result and return a reference to the stored copy
    pub fn record(&mut self, result: ValidationResult) -> &ValidationResult {
        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn last(&self) -> Option<&ValidationResult> {
        self.results.last()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Runs the leakage-safe pipeline for one split assignment
#[derive(Debug, Clone)]
pub struct GroupValidator {
    config: ValidationConfig,
}

impl GroupValidator {
    pub fn new(config: ValidationConfig) -> Result<Self> {
        config.validate().map_err(ValidationError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Seeded train/val/test split of every group in the store
    pub fn split(&self, store: &GroupStore) -> Result<SplitAssignment> {
        GroupSplitter::new(self.config.seed).split(
            &store.ids(),
            self.config.test_ratio,
            self.config.val_ratio,
        )
    }

    /// Fit `model` on the train groups of `assignment` and score every split
    pub fn validate(
        &self,
        model: &mut dyn Classifier,
        store: &GroupStore,
        assignment: &SplitAssignment,
    ) -> Result<ValidationResult> {
        let pools = DatasetAssembler::new(store).assemble_split(assignment)?;

        let preprocessor = Preprocessor::fit(&pools.train)?;
        let train_scaled = preprocessor.transform(&pools.train)?;
        let val_scaled = preprocessor.transform(&pools.val)?;
        let test_scaled = preprocessor.transform(&pools.test)?;

        let (train_balanced, balance_status) = if self.config.balance.enabled {
            let outcome = ClassBalancer::from_config(&self.config.balance, self.config.seed)?
                .balance(&train_scaled);
            (outcome.data, outcome.status)
        } else {
            (train_scaled.clone(), BalanceStatus::Disabled)
        };

        model.fit(&train_balanced.features, &train_balanced.labels)?;

        let train = evaluate(&*model, &train_balanced)?;
        let val = evaluate(&*model, &val_scaled)?;
        let test = evaluate(&*model, &test_scaled)?;

        tracing::info!(
            "{}: train acc={:.3}, val acc={:.3}, test acc={:.3}",
            model.name(),
            train.accuracy,
            val.accuracy,
            test.accuracy
        );

        let metadata = ValidationMetadata {
            model: ModelIdentity::of(&*model),
            train_groups: assignment.train().to_vec(),
            val_groups: assignment.val().to_vec(),
            test_groups: assignment.test().to_vec(),
            balancing_applied: balance_status.applied(),
            balance_status,
            class_distribution: ClassDistribution {
                train_original: pools.train.class_counts(),
                train_balanced: train_balanced.class_counts(),
                test: pools.test.class_counts(),
            },
            scaling: preprocessor.params().clone(),
        };

        Ok(ValidationResult {
            train,
            val,
            test,
            metadata,
        })
    }

    /// Validate and append the result to `history`
    pub fn validate_into<'h>(
        &self,
        model: &mut dyn Classifier,
        store: &GroupStore,
        assignment: &SplitAssignment,
        history: &'h mut RunHistory,
    ) -> Result<&'h ValidationResult> {
        let result = self.validate(model, store, assignment)?;
        Ok(history.record(result))
    }
}

/// Predict and score one pool
fn evaluate(model: &dyn Classifier, data: &Dataset) -> Result<MetricBundle> {
    let predicted = model.predict(&data.features)?;
    let scores = model.scoring().positive_scores(&data.features)?;
    MetricBundle::compute(&data.labels, &predicted, scores.as_deref())
}
