//! Pooling per-group data into split datasets

use crate::dataset::{Dataset, FeatureMatrix, GroupStore};
use crate::error::{Result, ValidationError};
use crate::split::{SplitAssignment, SplitRole};

/// Pooled train/val/test datasets for one assignment
#[derive(Debug, Clone)]
pub struct SplitData {
    pub train: Dataset,
    pub val: Dataset,
    pub test: Dataset,
}

/// Concatenates group data in the order the split lists the groups
pub struct DatasetAssembler<'a> {
    store: &'a GroupStore,
}

impl<'a> DatasetAssembler<'a> {
    pub fn new(store: &'a GroupStore) -> Self {
        Self { store }
    }

    /// Pool the examples of `ids` into one dataset
    ///
    /// # Errors
    /// `EmptySplit` when `ids` is empty or the groups hold no examples,
    /// `UnknownGroup` when an ID is missing from the store.
    pub fn assemble(&self, split_name: &str, ids: &[String]) -> Result<Dataset> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySplit {
                split: split_name.to_string(),
                reason: "no groups assigned".to_string(),
            });
        }

        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
            let data = self
                .store
                .get(id)
                .ok_or_else(|| ValidationError::UnknownGroup(id.clone()))?;
            groups.push(data);
        }

        let n_examples: usize = groups.iter().map(|g| g.len()).sum();
        if n_examples == 0 {
            return Err(ValidationError::EmptySplit {
                split: split_name.to_string(),
                reason: format!("{} groups contain zero examples", ids.len()),
            });
        }

        let n_cols = groups
            .iter()
            .find(|g| !g.is_empty())
            .map_or(0, |g| g.n_features());
        let mut values = Vec::with_capacity(n_examples * n_cols);
        let mut labels = Vec::with_capacity(n_examples);
        for data in groups.iter().filter(|g| !g.is_empty()) {
            if data.n_features() != n_cols {
                return Err(ValidationError::DimensionMismatch {
                    expected: n_cols,
                    actual: data.n_features(),
                });
            }
            values.extend_from_slice(data.features.as_slice());
            labels.extend_from_slice(&data.labels);
        }

        Dataset::new(FeatureMatrix::from_flat(n_examples, n_cols, values)?, labels)
    }

    /// Pool all three partitions of an assignment
    pub fn assemble_split(&self, assignment: &SplitAssignment) -> Result<SplitData> {
        let train = self.assemble(SplitRole::Train.as_str(), assignment.train())?;
        let val = self.assemble(SplitRole::Val.as_str(), assignment.val())?;
        let test = self.assemble(SplitRole::Test.as_str(), assignment.test())?;

        for (role, ids, data) in [
            (SplitRole::Train, assignment.train(), &train),
            (SplitRole::Val, assignment.val(), &val),
            (SplitRole::Test, assignment.test(), &test),
        ] {
            tracing::info!(
                "{}: {} groups, {} examples",
                role.as_str(),
                ids.len(),
                data.len()
            );
        }

        Ok(SplitData { train, val, test })
    }
}
