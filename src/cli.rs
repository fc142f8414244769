//! CLI argument parsing for cohortval

use crate::baseline::ModelKind;
use crate::config::ValidationConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "cohortval")]
#[command(version)]
#[command(about = "Subject-independent validation for binary classifiers", long_about = None)]
pub struct Cli {
    /// JSON group store: {"groups": [{"id", "features", "labels"}]}
    #[arg(short, long, value_name = "FILE")]
    pub groups: PathBuf,

    /// TOML configuration file (missing keys use defaults)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Baseline model to validate
    #[arg(short, long, value_enum, default_value = "nearest-centroid")]
    pub model: ModelKind,

    /// Number of cross-validation folds (overrides config)
    #[arg(short = 'k', long)]
    pub folds: Option<usize>,

    /// Random seed for splitting and oversampling (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for cross-validation, 0 = all cores (overrides config)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Disable minority-class oversampling
    #[arg(long = "no-balance")]
    pub no_balance: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Compare all baseline models on the single split
    #[arg(long)]
    pub compare: bool,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut ValidationConfig) {
        if let Some(folds) = self.folds {
            config.n_folds = folds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.no_balance {
            config.balance.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_groups() {
        assert!(Cli::try_parse_from(["cohortval"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["cohortval", "--groups", "data.json"]);
        assert_eq!(cli.groups, PathBuf::from("data.json"));
        assert_eq!(cli.model, ModelKind::NearestCentroid);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.config.is_none());
        assert!(!cli.no_balance);
        assert!(!cli.compare);
    }

    #[test]
    fn test_cli_model_names() {
        let cli = Cli::parse_from(["cohortval", "-g", "d.json", "--model", "naive-bayes"]);
        assert_eq!(cli.model, ModelKind::NaiveBayes);
        let cli = Cli::parse_from(["cohortval", "-g", "d.json", "-m", "majority"]);
        assert_eq!(cli.model, ModelKind::Majority);
        assert!(Cli::try_parse_from(["cohortval", "-g", "d.json", "-m", "svm"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "cohortval",
            "-g",
            "d.json",
            "--folds",
            "3",
            "--seed",
            "7",
            "--workers",
            "2",
            "--no-balance",
        ]);
        let mut config = ValidationConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.n_folds, 3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.workers, 2);
        assert!(!config.balance.enabled);
    }

    #[test]
    fn test_cli_no_overrides_keeps_config() {
        let cli = Cli::parse_from(["cohortval", "-g", "d.json"]);
        let mut config = ValidationConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, ValidationConfig::default());
    }

    #[test]
    fn test_cli_json_format() {
        let cli = Cli::parse_from(["cohortval", "-g", "d.json", "--format", "json", "--compare"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.compare);
    }
}
