//! Configuration for subject-independent validation
//!
//! Splitting, balancing, fold orchestration and the plausibility rules are
//! all described by one [`ValidationConfig`] value.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Synthetic minority oversampling settings (train pool only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Run oversampling at all
    pub enabled: bool,

    /// Target minority:majority ratio after oversampling, in (0, 1]
    ///
    /// Default: 0.5 (one minority example per two majority examples)
    pub ratio: f64,

    /// Nearest same-class neighbors considered for interpolation
    ///
    /// Default: 5
    pub k_neighbors: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ratio: 0.5,
            k_neighbors: 5,
        }
    }
}

/// Plausibility thresholds used by the result analyzer
///
/// The defaults are behavioral constants of the rule set. Their clinical
/// validity is unverified; change them through configuration only.
///
/// # Example
/// ```
/// use cohortval::config::AnalyzerThresholds;
///
/// let thresholds = AnalyzerThresholds::default();
/// assert_eq!(thresholds.max_plausible_accuracy, 0.99);
/// assert_eq!(thresholds.min_minority_fraction, 0.05);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerThresholds {
    /// Test accuracy at or above this value is a red flag
    pub max_plausible_accuracy: f64,

    /// Test AUC at or above this value is a red flag
    pub max_plausible_auc: f64,

    /// Train accuracy minus test accuracy above this value is a warning
    pub max_train_test_gap: f64,

    /// Minority-class fraction of the test split below this value is a warning
    pub min_minority_fraction: f64,
}

impl Default for AnalyzerThresholds {
    fn default() -> Self {
        Self {
            max_plausible_accuracy: 0.99,
            max_plausible_auc: 0.99,
            max_train_test_gap: 0.10,
            min_minority_fraction: 0.05,
        }
    }
}

impl AnalyzerThresholds {
    /// Flag more results (lower ceilings, tighter gap)
    pub fn strict() -> Self {
        Self {
            max_plausible_accuracy: 0.95,
            max_plausible_auc: 0.95,
            max_train_test_gap: 0.05,
            min_minority_fraction: 0.10,
        }
    }

    /// Flag fewer results
    pub fn permissive() -> Self {
        Self {
            max_plausible_accuracy: 0.999,
            max_plausible_auc: 0.999,
            max_train_test_gap: 0.20,
            min_minority_fraction: 0.01,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("max_plausible_accuracy", self.max_plausible_accuracy),
            ("max_plausible_auc", self.max_plausible_auc),
            ("max_train_test_gap", self.max_train_test_gap),
            ("min_minority_fraction", self.min_minority_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be in [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Top-level configuration for a validation run
///
/// # Example
/// ```
/// use cohortval::config::ValidationConfig;
///
/// let config = ValidationConfig::default();
/// assert_eq!(config.seed, 42);
/// assert_eq!(config.n_folds, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Seed for group shuffling and synthetic oversampling
    pub seed: u64,

    /// Fraction of groups held out for testing, in (0, 1)
    pub test_ratio: f64,

    /// Fraction of groups held out for validation, in (0, 1)
    pub val_ratio: f64,

    /// Requested cross-validation folds (clamped to the group count)
    pub n_folds: usize,

    /// Concurrent fold workers (0 = available parallelism, 1 = sequential)
    pub workers: usize,

    pub balance: BalanceConfig,

    pub analyzer: AnalyzerThresholds,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_ratio: 0.2,
            val_ratio: 0.2,
            n_folds: 5,
            workers: 0,
            balance: BalanceConfig::default(),
            analyzer: AnalyzerThresholds::default(),
        }
    }
}

impl ValidationConfig {
    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolved worker count
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_ratios(self.test_ratio, self.val_ratio)?;

        if self.n_folds == 0 {
            return Err("n_folds must be >= 1, got 0".to_string());
        }

        if !(self.balance.ratio > 0.0 && self.balance.ratio <= 1.0) {
            return Err(format!(
                "balance.ratio must be in (0, 1], got {}",
                self.balance.ratio
            ));
        }

        if self.balance.k_neighbors == 0 {
            return Err("balance.k_neighbors must be >= 1, got 0".to_string());
        }

        self.analyzer.validate()
    }
}

/// Check split ratios: both in (0, 1) and summing below 1
pub fn validate_ratios(test_ratio: f64, val_ratio: f64) -> Result<(), String> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(format!("test_ratio must be in (0, 1), got {}", test_ratio));
    }
    if !(val_ratio > 0.0 && val_ratio < 1.0) {
        return Err(format!("val_ratio must be in (0, 1), got {}", val_ratio));
    }
    if test_ratio + val_ratio >= 1.0 {
        return Err(format!(
            "test_ratio + val_ratio must be < 1, got {}",
            test_ratio + val_ratio
        ));
    }
    Ok(())
}
