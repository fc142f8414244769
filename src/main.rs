use anyhow::{Context, Result};
use clap::Parser;
use cohortval::analyzer::{Analysis, ResultAnalyzer};
use cohortval::baseline::ModelKind;
use cohortval::cli::{Cli, OutputFormat};
use cohortval::comparison::{best_by_f1, compare_models, comparison_table, ComparisonRow};
use cohortval::{
    AggregatedCvResult, CrossValidator, GroupStore, GroupValidator, RunHistory, ValidationConfig,
    ValidationResult,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Everything one invocation produces
#[derive(Serialize)]
struct RunReport {
    config: ValidationConfig,
    groups: usize,
    examples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    single: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<Vec<ComparisonRow>>,
    cross_validation: AggregatedCvResult,
}

fn print_text(report: &RunReport) {
    println!(
        "=== cohortval: {} groups, {} examples ===",
        report.groups, report.examples
    );
    println!();

    if let Some(result) = &report.single {
        println!("Single split: {}", result.summary_line());
        println!(
            "  train groups: {} | val groups: {} | test groups: {}",
            result.metadata.train_groups.join(","),
            result.metadata.val_groups.join(","),
            result.metadata.test_groups.join(",")
        );
        println!();
    }

    if let Some(analysis) = &report.analysis {
        print!("{}", analysis.to_report_string());
        println!();
    }

    if let Some(rows) = &report.comparison {
        println!("Model comparison (test split):");
        print!("{}", comparison_table(rows));
        if let Some(best) = best_by_f1(rows) {
            println!("Best by F1: {}", best.model());
        }
        println!();
    }

    print!("{}", report.cross_validation.to_report_string());
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => ValidationConfig::from_toml_file(path)?,
        None => ValidationConfig::default(),
    };
    args.apply_overrides(&mut config);

    let store = GroupStore::from_json_file(&args.groups)?;
    tracing::info!(
        "Loaded {} groups ({} examples) from {}",
        store.len(),
        store.total_examples(),
        args.groups.display()
    );

    let validator = GroupValidator::new(config.clone()).context("Invalid configuration")?;
    let assignment = validator
        .split(&store)
        .context("Failed to split groups into train/val/test")?;
    let mut history = RunHistory::new();

    let (single, analysis, comparison) = if args.compare {
        let factories: Vec<_> = ModelKind::ALL
            .iter()
            .map(|kind| (kind.model_name(), kind.factory()))
            .collect();
        let named: Vec<_> = factories
            .iter()
            .map(|(name, factory)| (*name, &**factory))
            .collect();
        let rows = compare_models(&validator, &store, &assignment, &named, &mut history);
        (None, None, Some(rows))
    } else {
        let mut model = args.model.build();
        let result = validator
            .validate_into(model.as_mut(), &store, &assignment, &mut history)
            .with_context(|| format!("Validation of {} failed", args.model.model_name()))?
            .clone();
        let analysis = ResultAnalyzer::new(config.analyzer.clone()).analyze(&result);
        (Some(result), Some(analysis), None)
    };

    let cross_validation = CrossValidator::new(config.clone())?.run(&*args.model.factory(), &store);

    let report = RunReport {
        config,
        groups: store.len(),
        examples: store.total_examples(),
        single,
        analysis,
        comparison,
        cross_validation,
    };

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
