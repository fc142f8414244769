//! Model capability interface
//!
//! Classifiers implement `fit` and `predict` and declare how (or whether)
//! they produce continuous scores through an explicit [`Scoring`] tag.
//! The evaluator dispatches on the tag instead of probing for methods.

use crate::dataset::{FeatureMatrix, Label};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Models that output a positive-class probability per row
pub trait ProbabilityModel {
    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>>;
}

/// Models that output an unbounded decision score per row (higher = more positive)
pub trait DecisionModel {
    fn decision_function(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>>;
}

/// Score production capability of a classifier
pub enum Scoring<'a> {
    Probability(&'a dyn ProbabilityModel),
    Decision(&'a dyn DecisionModel),
    LabelOnly,
}

/// Serializable tag for [`Scoring`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    Probability,
    Decision,
    LabelOnly,
}

impl Scoring<'_> {
    pub fn kind(&self) -> ScoringKind {
        match self {
            Scoring::Probability(_) => ScoringKind::Probability,
            Scoring::Decision(_) => ScoringKind::Decision,
            Scoring::LabelOnly => ScoringKind::LabelOnly,
        }
    }

    /// Positive-class scores for ranking, `None` for label-only models
    ///
    /// Decision scores are mapped through the logistic function so every
    /// capable model yields values in (0, 1).
    pub fn positive_scores(&self, features: &FeatureMatrix) -> anyhow::Result<Option<Vec<f64>>> {
        let scores = match self {
            Scoring::Probability(model) => model.predict_proba(features)?,
            Scoring::Decision(model) => model
                .decision_function(features)?
                .into_iter()
                .map(logistic)
                .collect(),
            Scoring::LabelOnly => return Ok(None),
        };
        if scores.len() != features.n_rows() {
            anyhow::bail!(
                "model returned {} scores for {} rows",
                scores.len(),
                features.n_rows()
            );
        }
        Ok(Some(scores))
    }
}

/// Binary classifier consumed by the validation pipeline
///
/// One instance is fitted once per run; cross-validation builds a fresh
/// instance per fold through a [`ModelFactory`].
pub trait Classifier: Send {
    /// Stable model name recorded in result metadata
    fn name(&self) -> &str;

    /// Hyperparameters recorded in result metadata
    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> anyhow::Result<()>;

    fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<Label>>;

    fn scoring(&self) -> Scoring<'_> {
        Scoring::LabelOnly
    }
}

/// Builds a fresh, unfitted classifier
pub type ModelFactory = dyn Fn() -> Box<dyn Classifier> + Send + Sync;

/// Model name, parameters and scoring capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub name: String,
    pub params: BTreeMap<String, String>,
    pub scoring: ScoringKind,
}

impl ModelIdentity {
    pub fn of(model: &dyn Classifier) -> Self {
        Self {
            name: model.name().to_string(),
            params: model.params(),
            scoring: model.scoring().kind(),
        }
    }
}

/// Standard logistic function
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
