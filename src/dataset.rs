//! Grouped example storage
//!
//! A group (subject, patient, recording site) owns an ordered sequence of
//! fixed-length feature vectors with aligned binary labels. Groups are the
//! unit of splitting: every example of a group lands in the same split.

use crate::error::{Result, ValidationError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Binary class label (0 = negative, 1 = positive)
pub type Label = u8;

/// Dense row-major feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    values: Vec<f32>,
    n_rows: usize,
    n_cols: usize,
}

impl FeatureMatrix {
    /// Build from a flat row-major buffer
    pub fn from_flat(n_rows: usize, n_cols: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != n_rows * n_cols {
            return Err(ValidationError::DimensionMismatch {
                expected: n_rows * n_cols,
                actual: values.len(),
            });
        }
        Ok(Self {
            values,
            n_rows,
            n_cols,
        })
    }

    /// Build from individual rows; all rows must share one length
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(ValidationError::DimensionMismatch {
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            values,
            n_rows: rows.len(),
            n_cols,
        })
    }

    /// An empty matrix with a fixed column count
    pub fn empty(n_cols: usize) -> Self {
        Self {
            values: Vec::new(),
            n_rows: 0,
            n_cols,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Append one row (length must equal the column count)
    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.n_cols {
            return Err(ValidationError::DimensionMismatch {
                expected: self.n_cols,
                actual: row.len(),
            });
        }
        self.values.extend_from_slice(row);
        self.n_rows += 1;
        Ok(())
    }
}

/// Per-class example counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub negative: usize,
    pub positive: usize,
}

impl ClassCounts {
    pub fn from_labels(labels: &[Label]) -> Self {
        let positive = labels.iter().filter(|&&l| l == 1).count();
        Self {
            negative: labels.len() - positive,
            positive,
        }
    }

    pub fn total(&self) -> usize {
        self.negative + self.positive
    }

    /// Number of distinct labels present (0, 1 or 2)
    pub fn distinct(&self) -> usize {
        usize::from(self.negative > 0) + usize::from(self.positive > 0)
    }

    /// Fraction of examples in the smaller class (0 when empty)
    pub fn minority_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.negative.min(self.positive) as f64 / total as f64
    }
}

/// Features and labels for one group or one pooled split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: FeatureMatrix,
    pub labels: Vec<Label>,
}

impl Dataset {
    /// Validate row/label alignment and binary labels
    pub fn new(features: FeatureMatrix, labels: Vec<Label>) -> Result<Self> {
        if features.n_rows() != labels.len() {
            return Err(ValidationError::DimensionMismatch {
                expected: features.n_rows(),
                actual: labels.len(),
            });
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(ValidationError::InvalidGroupData {
                group: String::from("<dataset>"),
                reason: format!("label {} is not binary", bad),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.n_cols()
    }

    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.labels)
    }
}

/// One group as it appears in a JSON group file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<Label>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupFile {
    groups: Vec<GroupRecord>,
}

/// Read-only store of per-group datasets, ordered by group ID
///
/// # Example
/// ```
/// use cohortval::dataset::{Dataset, FeatureMatrix, GroupStore};
///
/// let mut store = GroupStore::new();
/// let features = FeatureMatrix::from_rows(&[vec![0.1, 0.2], vec![0.3, 0.4]]).unwrap();
/// store.insert("chb01", Dataset::new(features, vec![0, 1]).unwrap()).unwrap();
/// assert_eq!(store.ids(), vec!["chb01".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroupStore {
    groups: BTreeMap<String, Dataset>,
    n_features: Option<usize>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group; IDs must be unique and all groups share one feature dimension
    pub fn insert(&mut self, id: impl Into<String>, data: Dataset) -> Result<()> {
        let id = id.into();
        if self.groups.contains_key(&id) {
            return Err(ValidationError::DuplicateGroup(id));
        }
        if !data.is_empty() {
            match self.n_features {
                Some(expected) if expected != data.n_features() => {
                    return Err(ValidationError::DimensionMismatch {
                        expected,
                        actual: data.n_features(),
                    });
                }
                Some(_) => {}
                None => self.n_features = Some(data.n_features()),
            }
        }
        self.groups.insert(id, data);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.groups.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    /// Group IDs in ascending order
    pub fn ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Shared feature dimension (None until a non-empty group is inserted)
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn total_examples(&self) -> usize {
        self.groups.values().map(Dataset::len).sum()
    }

    /// Build a store from deserialized group records
    pub fn from_records(records: Vec<GroupRecord>) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            let features = FeatureMatrix::from_rows(&record.features).map_err(|e| {
                ValidationError::InvalidGroupData {
                    group: record.id.clone(),
                    reason: e.to_string(),
                }
            })?;
            let data = Dataset::new(features, record.labels).map_err(|e| {
                ValidationError::InvalidGroupData {
                    group: record.id.clone(),
                    reason: e.to_string(),
                }
            })?;
            store.insert(record.id, data)?;
        }
        Ok(store)
    }

    /// Parse a JSON document of the form `{"groups": [{"id", "features", "labels"}]}`
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let file: GroupFile = serde_json::from_str(json).context("Invalid group store JSON")?;
        Ok(Self::from_records(file.groups)?)
    }

    /// Load a JSON group file from disk
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read group file: {}", path.as_ref().display())
        })?;
        Self::from_json_str(&content)
    }
}
