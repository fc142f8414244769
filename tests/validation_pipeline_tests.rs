//! End-to-end tests for the group-independent validation pipeline
//!
//! Covers leakage safety of scaling, train-only balancing, cross-validation
//! aggregation and analyzer verdicts on real pipeline output.

mod utils;

use cohortval::baseline::{GaussianNaiveBayes, ModelKind, NearestCentroid};
use cohortval::metrics::MetricName;
use cohortval::{
    CrossValidator, Dataset, FeatureMatrix, GroupStore, GroupValidator, ResultAnalyzer,
    ValidationConfig,
};
use utils::{grouped_store, grouped_store_json, separable_store};

fn config() -> ValidationConfig {
    ValidationConfig {
        workers: 1,
        ..ValidationConfig::default()
    }
}

#[test]
fn test_scaler_fitted_on_train_groups_only() {
    let store = grouped_store(10, 20, 4);
    let validator = GroupValidator::new(config()).unwrap();
    let assignment = validator.split(&store).unwrap();
    let result = validator
        .validate(&mut NearestCentroid::new(), &store, &assignment)
        .unwrap();

    let mut sums = [0.0f64; 3];
    let mut count = 0usize;
    for id in &result.metadata.train_groups {
        for row in store.get(id).unwrap().features.rows() {
            for (s, &v) in sums.iter_mut().zip(row) {
                *s += f64::from(v);
            }
            count += 1;
        }
    }
    for (f, sum) in sums.iter().enumerate() {
        let expected = sum / count as f64;
        let actual = f64::from(result.metadata.scaling.means[f]);
        assert!(
            (expected - actual).abs() < 1e-3,
            "feature {}: expected mean {}, got {}",
            f,
            expected,
            actual
        );
    }
}

#[test]
fn test_holdout_values_do_not_influence_training() {
    let store = grouped_store(10, 20, 4);
    let validator = GroupValidator::new(config()).unwrap();
    let assignment = validator.split(&store).unwrap();
    let baseline = validator
        .validate(&mut GaussianNaiveBayes::new(), &store, &assignment)
        .unwrap();

    // same ids, wildly different values in the held-out groups
    let mut perturbed = GroupStore::new();
    for id in store.ids() {
        let data = store.get(&id).unwrap().clone();
        let data = if assignment.train().contains(&id) {
            data
        } else {
            let values = data.features.as_slice().iter().map(|v| v * 100.0 + 7.0).collect();
            let features =
                FeatureMatrix::from_flat(data.features.n_rows(), data.features.n_cols(), values)
                    .unwrap();
            Dataset::new(features, data.labels.clone()).unwrap()
        };
        perturbed.insert(id, data).unwrap();
    }
    let shifted = validator
        .validate(&mut GaussianNaiveBayes::new(), &perturbed, &assignment)
        .unwrap();

    assert_eq!(shifted.metadata.scaling, baseline.metadata.scaling);
    assert_eq!(shifted.train, baseline.train);
    assert_eq!(
        shifted.metadata.class_distribution.train_balanced,
        baseline.metadata.class_distribution.train_balanced
    );
}

#[test]
fn test_balancing_touches_train_only() {
    let store = grouped_store(10, 20, 5);
    let validator = GroupValidator::new(config()).unwrap();
    let assignment = validator.split(&store).unwrap();
    let result = validator
        .validate(&mut NearestCentroid::new(), &store, &assignment)
        .unwrap();

    let dist = &result.metadata.class_distribution;
    assert!(result.metadata.balancing_applied);
    assert_eq!(dist.train_balanced.negative, dist.train_original.negative);
    // ratio 0.5 target: floor(0.5 * negatives)
    assert_eq!(dist.train_balanced.positive, dist.train_original.negative / 2);

    let test_positive: usize = assignment
        .test()
        .iter()
        .map(|id| store.get(id).unwrap().class_counts().positive)
        .sum();
    assert_eq!(dist.test.positive, test_positive);
    assert_eq!(result.test.n_positive, test_positive);
}

#[test]
fn test_single_run_is_deterministic() {
    let store = grouped_store(8, 16, 4);
    let validator = GroupValidator::new(config()).unwrap();
    let a = validator
        .validate(
            &mut NearestCentroid::new(),
            &store,
            &validator.split(&store).unwrap(),
        )
        .unwrap();
    let b = validator
        .validate(
            &mut NearestCentroid::new(),
            &store,
            &validator.split(&store).unwrap(),
        )
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_too_few_groups_for_single_split() {
    let store = grouped_store(2, 10, 3);
    let validator = GroupValidator::new(config()).unwrap();
    assert!(validator.split(&store).is_err());
}

#[test]
fn test_cross_validation_covers_every_group_once() {
    let store = grouped_store(10, 30, 4);
    let cv = CrossValidator::new(ValidationConfig {
        n_folds: 5,
        workers: 4,
        ..ValidationConfig::default()
    })
    .unwrap();
    let result = cv.run(&*ModelKind::NaiveBayes.factory(), &store);

    assert!(!result.is_insufficient());
    assert_eq!(result.n_folds_completed, 5);
    assert_eq!(result.totals.n_samples_total, store.total_examples());

    let accuracy = result.metric(MetricName::Accuracy).unwrap();
    assert_eq!(accuracy.values.len(), 5);
    let min = accuracy.values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = accuracy.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(accuracy.mean >= min - 1e-6 && accuracy.mean <= max + 1e-6);
    let (lo, hi) = accuracy.ci95.unwrap();
    assert!(lo <= accuracy.mean && accuracy.mean <= hi);
}

#[test]
fn test_cross_validation_deterministic_across_worker_counts() {
    let store = grouped_store(9, 12, 3);
    let run = |workers| {
        CrossValidator::new(ValidationConfig {
            n_folds: 3,
            workers,
            ..ValidationConfig::default()
        })
        .unwrap()
        .run(&*ModelKind::NearestCentroid.factory(), &store)
    };
    assert_eq!(run(1), run(3));
}

#[test]
fn test_cross_validation_clamps_fold_count() {
    let store = grouped_store(4, 12, 3);
    let result = CrossValidator::new(ValidationConfig {
        n_folds: 20,
        ..config()
    })
    .unwrap()
    .run(&*ModelKind::NearestCentroid.factory(), &store);
    assert_eq!(result.n_folds_requested, 20);
    assert_eq!(result.n_folds_planned, 4);
    assert!(result.n_folds_completed > 0);
}

#[test]
fn test_cross_validation_insufficient_without_groups() {
    let store = grouped_store(1, 12, 3);
    let result = CrossValidator::new(config())
        .unwrap()
        .run(&*ModelKind::Majority.factory(), &store);
    assert!(result.is_insufficient());
    assert!(result.metrics.is_empty());
    assert!(result.to_report_string().contains("INSUFFICIENT"));
}

#[test]
fn test_analyzer_flags_perfect_separation() {
    let store = separable_store(6, 20, 4);
    let validator = GroupValidator::new(config()).unwrap();
    let assignment = validator.split(&store).unwrap();
    let result = validator
        .validate(&mut NearestCentroid::new(), &store, &assignment)
        .unwrap();
    assert_eq!(result.test.accuracy, 1.0);

    let analysis = ResultAnalyzer::default().analyze(&result);
    assert!(!analysis.is_realistic);
    assert_eq!(analysis.red_flags.len(), 2);
    assert!(analysis
        .recommendations
        .iter()
        .any(|r| r == "Consider simpler baseline models"));
}

#[test]
fn test_json_group_store_round_trip() {
    let store = GroupStore::from_json_str(&grouped_store_json(5, 10, 2)).unwrap();
    let direct = grouped_store(5, 10, 2);
    assert_eq!(store.ids(), direct.ids());
    assert_eq!(store.total_examples(), 50);
    for id in direct.ids() {
        assert_eq!(store.get(&id), direct.get(&id));
    }
}
