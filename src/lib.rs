//! cohortval - Subject-independent validation for binary classifiers
//!
//! Evaluates classifiers on data grouped by subject (patient, recording
//! session, device) so that no group ever contributes examples to more than
//! one of train, validation and test. Scaling is fitted on the train pool
//! only and minority oversampling touches the train pool only.
//!
//! # Example
//! ```
//! use cohortval::baseline::NearestCentroid;
//! use cohortval::config::ValidationConfig;
//! use cohortval::dataset::{Dataset, FeatureMatrix, GroupStore};
//! use cohortval::validator::GroupValidator;
//!
//! let mut store = GroupStore::new();
//! for g in 0..5 {
//!     let rows: Vec<Vec<f32>> = (0..8)
//!         .map(|i| if i < 2 { vec![1.0 + g as f32 * 0.1, 1.0] } else { vec![-1.0, -1.0 - i as f32 * 0.1] })
//!         .collect();
//!     let labels = (0..8).map(|i| u8::from(i < 2)).collect();
//!     let data = Dataset::new(FeatureMatrix::from_rows(&rows).unwrap(), labels).unwrap();
//!     store.insert(format!("patient_{}", g), data).unwrap();
//! }
//!
//! let validator = GroupValidator::new(ValidationConfig::default()).unwrap();
//! let assignment = validator.split(&store).unwrap();
//! let result = validator
//!     .validate(&mut NearestCentroid::new(), &store, &assignment)
//!     .unwrap();
//! assert_eq!(result.metadata.test_groups.len(), 1);
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod assemble;
pub mod balance;
pub mod baseline;
pub mod cli;
pub mod comparison;
pub mod config;
pub mod cross_validation;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model;
pub mod preprocess;
pub mod split;
pub mod validator;

pub use aggregate::{AggregatedCvResult, CvStatus, MetricSummary};
pub use analyzer::{Analysis, ResultAnalyzer};
pub use config::{AnalyzerThresholds, BalanceConfig, ValidationConfig};
pub use cross_validation::{CrossValidator, FoldOutcome, FoldResult};
pub use dataset::{Dataset, FeatureMatrix, GroupStore, Label};
pub use error::{Result, ValidationError};
pub use metrics::{MetricBundle, MetricName};
pub use model::{Classifier, ModelFactory, Scoring};
pub use split::{GroupSplitter, SplitAssignment};
pub use validator::{GroupValidator, RunHistory, ValidationResult};
