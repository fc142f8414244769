//! Reference classifiers
//!
//! Small baselines covering each scoring capability. They are what the CLI
//! runs and what implausible results should be compared against.

use crate::dataset::{FeatureMatrix, Label};
use crate::model::{Classifier, DecisionModel, ModelFactory, ProbabilityModel, Scoring};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Predicts the most frequent training label (ties go to 0)
#[derive(Debug, Clone, Default)]
pub struct MajorityClass {
    majority: Option<Label>,
}

impl MajorityClass {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for MajorityClass {
    fn name(&self) -> &str {
        "majority_class"
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> anyhow::Result<()> {
        check_training_data(features, labels)?;
        let positives = labels.iter().filter(|&&l| l == 1).count();
        self.majority = Some(u8::from(positives * 2 > labels.len()));
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<Label>> {
        let Some(label) = self.majority else {
            anyhow::bail!("{} used before fit", self.name());
        };
        Ok(vec![label; features.n_rows()])
    }
}

/// Per-class centroids; decision score is `dist(neg) - dist(pos)`
#[derive(Debug, Clone, Default)]
pub struct NearestCentroid {
    centroids: Option<[Vec<f64>; 2]>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionModel for NearestCentroid {
    fn decision_function(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        let Some([negative, positive]) = &self.centroids else {
            anyhow::bail!("nearest_centroid used before fit");
        };
        check_width(features, negative.len())?;
        Ok(features
            .rows()
            .map(|row| euclidean(row, negative) - euclidean(row, positive))
            .collect())
    }
}

impl Classifier for NearestCentroid {
    fn name(&self) -> &str {
        "nearest_centroid"
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> anyhow::Result<()> {
        check_training_data(features, labels)?;
        let [negative, positive] = class_moments(features, labels)?;
        self.centroids = Some([negative.mean, positive.mean]);
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<Label>> {
        Ok(self
            .decision_function(features)?
            .into_iter()
            .map(|d| u8::from(d > 0.0))
            .collect())
    }

    fn scoring(&self) -> Scoring<'_> {
        Scoring::Decision(self)
    }
}

#[derive(Debug, Clone)]
struct GaussianClass {
    log_prior: f64,
    mean: Vec<f64>,
    var: Vec<f64>,
}

/// Gaussian naive Bayes with variance smoothing
#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    var_smoothing: f64,
    classes: Option<[GaussianClass; 2]>,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self {
            var_smoothing: 1e-9,
            classes: None,
        }
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Portion of the largest feature variance added to every variance
    pub fn with_var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }

    fn joint_log_likelihood(class: &GaussianClass, row: &[f32]) -> f64 {
        let mut ll = class.log_prior;
        for ((&x, &mu), &var) in row.iter().zip(&class.mean).zip(&class.var) {
            let d = f64::from(x) - mu;
            ll -= 0.5 * ((2.0 * std::f64::consts::PI * var).ln() + d * d / var);
        }
        ll
    }
}

impl ProbabilityModel for GaussianNaiveBayes {
    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        let Some([negative, positive]) = &self.classes else {
            anyhow::bail!("gaussian_naive_bayes used before fit");
        };
        check_width(features, negative.mean.len())?;
        Ok(features
            .rows()
            .map(|row| {
                let ll_neg = Self::joint_log_likelihood(negative, row);
                let ll_pos = Self::joint_log_likelihood(positive, row);
                // P(pos) = 1 / (1 + exp(ll_neg - ll_pos))
                crate::model::logistic(ll_pos - ll_neg)
            })
            .collect())
    }
}

impl Classifier for GaussianNaiveBayes {
    fn name(&self) -> &str {
        "gaussian_naive_bayes"
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("var_smoothing".to_string(), self.var_smoothing.to_string())])
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[Label]) -> anyhow::Result<()> {
        check_training_data(features, labels)?;
        let [negative, positive] = class_moments(features, labels)?;

        let max_var = negative
            .var
            .iter()
            .chain(&positive.var)
            .fold(0.0f64, |acc, &v| acc.max(v));
        let epsilon = (self.var_smoothing * max_var).max(self.var_smoothing).max(f64::MIN_POSITIVE);

        let n = labels.len() as f64;
        let build = |m: Moments| GaussianClass {
            log_prior: (m.count as f64 / n).ln(),
            mean: m.mean,
            var: m.var.into_iter().map(|v| v + epsilon).collect(),
        };
        self.classes = Some([build(negative), build(positive)]);
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<Label>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }

    fn scoring(&self) -> Scoring<'_> {
        Scoring::Probability(self)
    }
}

/// Per-class count, mean and population variance
struct Moments {
    count: usize,
    mean: Vec<f64>,
    var: Vec<f64>,
}

fn class_moments(features: &FeatureMatrix, labels: &[Label]) -> anyhow::Result<[Moments; 2]> {
    let n_cols = features.n_cols();
    let mut moments = [0u8, 1].map(|_| Moments {
        count: 0,
        mean: vec![0.0; n_cols],
        var: vec![0.0; n_cols],
    });

    for (row, &label) in features.rows().zip(labels) {
        let m = &mut moments[usize::from(label == 1)];
        m.count += 1;
        for (acc, &x) in m.mean.iter_mut().zip(row) {
            *acc += f64::from(x);
        }
    }
    for (class, m) in moments.iter_mut().enumerate() {
        if m.count == 0 {
            anyhow::bail!("training data has no examples of class {}", class);
        }
        let count = m.count as f64;
        m.mean.iter_mut().for_each(|v| *v /= count);
    }

    for (row, &label) in features.rows().zip(labels) {
        let m = &mut moments[usize::from(label == 1)];
        for ((acc, &mu), &x) in m.var.iter_mut().zip(&m.mean).zip(row) {
            let d = f64::from(x) - mu;
            *acc += d * d;
        }
    }
    for m in moments.iter_mut() {
        let count = m.count as f64;
        m.var.iter_mut().for_each(|v| *v /= count);
    }

    Ok(moments)
}

fn check_training_data(features: &FeatureMatrix, labels: &[Label]) -> anyhow::Result<()> {
    if features.n_rows() != labels.len() {
        anyhow::bail!(
            "{} feature rows but {} labels",
            features.n_rows(),
            labels.len()
        );
    }
    if labels.is_empty() {
        anyhow::bail!("cannot fit on zero examples");
    }
    Ok(())
}

fn check_width(features: &FeatureMatrix, expected: usize) -> anyhow::Result<()> {
    if features.n_cols() != expected {
        anyhow::bail!(
            "model fitted on {} features, got {}",
            expected,
            features.n_cols()
        );
    }
    Ok(())
}

fn euclidean(row: &[f32], centroid: &[f64]) -> f64 {
    row.iter()
        .zip(centroid)
        .map(|(&x, &c)| {
            let d = f64::from(x) - c;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Built-in baseline classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Majority,
    NearestCentroid,
    NaiveBayes,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Majority,
        ModelKind::NearestCentroid,
        ModelKind::NaiveBayes,
    ];

    pub fn build(self) -> Box<dyn Classifier> {
        match self {
            ModelKind::Majority => Box::new(MajorityClass::new()),
            ModelKind::NearestCentroid => Box::new(NearestCentroid::new()),
            ModelKind::NaiveBayes => Box::new(GaussianNaiveBayes::new()),
        }
    }

    /// Factory producing a fresh unfitted instance per call
    pub fn factory(self) -> Box<ModelFactory> {
        Box::new(move || self.build())
    }

    /// Name of the classifier this kind builds
    pub fn model_name(self) -> &'static str {
        match self {
            ModelKind::Majority => "majority_class",
            ModelKind::NearestCentroid => "nearest_centroid",
            ModelKind::NaiveBayes => "gaussian_naive_bayes",
        }
    }
}
