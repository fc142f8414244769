//! Error types for the validation pipeline
//!
//! Balancing problems and single-class pools are not errors: they degrade
//! gracefully and are recorded on the result instead.

use thiserror::Error;

/// Errors for validation pipeline operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Insufficient groups: {available} groups cannot yield a non-empty train split (test={n_test}, val={n_val})")]
    InsufficientGroups {
        available: usize,
        n_test: usize,
        n_val: usize,
    },

    #[error("Empty split '{split}': {reason}")]
    EmptySplit { split: String, reason: String },

    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    #[error("Duplicate group '{0}'")]
    DuplicateGroup(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid group data for '{group}': {reason}")]
    InvalidGroupData { group: String, reason: String },

    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error(transparent)]
    Model(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
