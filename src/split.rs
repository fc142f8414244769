//! Group-disjoint splitting
//!
//! Splits operate on group IDs, never on individual examples, so every
//! example of a subject lands in the same partition. Shuffling is keyed by a
//! `u64` seed through ChaCha8, which makes the assignment reproducible across
//! platforms and independent of how many workers later consume it.

use crate::config::validate_ratios;
use crate::error::{Result, ValidationError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Partition a group belongs to within one run or fold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitRole {
    Train,
    Val,
    Test,
}

impl SplitRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitRole::Train => "train",
            SplitRole::Val => "val",
            SplitRole::Test => "test",
        }
    }
}

/// Disjoint train/val/test assignment of group IDs
///
/// Immutable once built; the constructor rejects any ID listed twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAssignment {
    train: Vec<String>,
    val: Vec<String>,
    test: Vec<String>,
}

impl SplitAssignment {
    pub fn new(train: Vec<String>, val: Vec<String>, test: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in train.iter().chain(&val).chain(&test) {
            if !seen.insert(id.as_str()) {
                return Err(ValidationError::DuplicateGroup(id.clone()));
            }
        }
        Ok(Self { train, val, test })
    }

    pub fn train(&self) -> &[String] {
        &self.train
    }

    pub fn val(&self) -> &[String] {
        &self.val
    }

    pub fn test(&self) -> &[String] {
        &self.test
    }

    pub fn groups(&self, role: SplitRole) -> &[String] {
        match role {
            SplitRole::Train => &self.train,
            SplitRole::Val => &self.val,
            SplitRole::Test => &self.test,
        }
    }

    pub fn role_of(&self, id: &str) -> Option<SplitRole> {
        [SplitRole::Train, SplitRole::Val, SplitRole::Test]
            .into_iter()
            .find(|&role| self.groups(role).iter().any(|g| g == id))
    }

    /// Total number of assigned groups
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition plan for one cross-validation fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldPlan {
    /// Zero-based fold index
    pub index: usize,
    pub partition: FoldPartition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldPartition {
    Ready(SplitAssignment),
    /// The fold cannot be trained (no groups left for the train partition)
    Skipped { reason: String },
}

/// Seeded group splitter for single runs and K-fold plans
#[derive(Debug, Clone, Copy)]
pub struct GroupSplitter {
    seed: u64,
}

impl GroupSplitter {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deterministic permutation of the given IDs
    pub fn shuffle(&self, ids: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(ValidationError::DuplicateGroup(id.clone()));
            }
        }
        let mut shuffled = ids.to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        shuffled.shuffle(&mut rng);
        Ok(shuffled)
    }

    /// Single train/val/test split
    ///
    /// `n_test = max(1, floor(n * test_ratio))`, `n_val = max(1, floor(n * val_ratio))`,
    /// the rest is train. Fails when fewer than one group is left for train.
    ///
    /// # Example
    /// ```
    /// use cohortval::split::GroupSplitter;
    ///
    /// let ids: Vec<String> = (1..=5).map(|i| format!("chb{:02}", i)).collect();
    /// let split = GroupSplitter::new(42).split(&ids, 0.2, 0.2).unwrap();
    /// assert_eq!(split.train().len(), 3);
    /// assert_eq!(split.val().len(), 1);
    /// assert_eq!(split.test().len(), 1);
    /// ```
    pub fn split(&self, ids: &[String], test_ratio: f64, val_ratio: f64) -> Result<SplitAssignment> {
        validate_ratios(test_ratio, val_ratio).map_err(ValidationError::InvalidConfig)?;

        let shuffled = self.shuffle(ids)?;
        let n = shuffled.len();
        let n_test = ((n as f64 * test_ratio).floor() as usize).max(1);
        let n_val = ((n as f64 * val_ratio).floor() as usize).max(1);

        if n < n_test + n_val + 1 {
            return Err(ValidationError::InsufficientGroups {
                available: n,
                n_test,
                n_val,
            });
        }
        let n_train = n - n_test - n_val;

        let mut rest = shuffled;
        let test = rest.split_off(n_train + n_val);
        let val = rest.split_off(n_train);
        let train = rest;

        tracing::info!(
            "Split {} groups: train={}, val={}, test={}",
            n,
            train.len(),
            val.len(),
            test.len()
        );

        SplitAssignment::new(train, val, test)
    }

    /// K-fold plans over one shared permutation
    ///
    /// Fold `i` tests on the `i`-th contiguous slice of size `n / k` (the last
    /// fold takes the remainder). The remaining groups keep their shuffled
    /// order; a trailing slice of `max(1, min(len / 4, len - 1))` becomes
    /// validation. `k` larger than the group count is clamped.
    pub fn k_fold(&self, ids: &[String], k: usize) -> Result<Vec<FoldPlan>> {
        if k == 0 {
            return Err(ValidationError::InvalidConfig(
                "fold count must be >= 1, got 0".to_string(),
            ));
        }

        let shuffled = self.shuffle(ids)?;
        let n = shuffled.len();
        let k = if k > n {
            tracing::warn!("Only {} groups available for {}-fold CV, clamping", n, k);
            n
        } else {
            k
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let fold_size = n / k;
        let mut plans = Vec::with_capacity(k);

        for index in 0..k {
            let start = index * fold_size;
            let end = if index + 1 == k { n } else { start + fold_size };

            let test = shuffled[start..end].to_vec();
            let mut remaining: Vec<String> = shuffled[..start]
                .iter()
                .chain(&shuffled[end..])
                .cloned()
                .collect();

            if remaining.is_empty() {
                plans.push(FoldPlan {
                    index,
                    partition: FoldPartition::Skipped {
                        reason: "no groups left outside the test fold".to_string(),
                    },
                });
                continue;
            }

            let len = remaining.len();
            let val_size = (len / 4).min(len - 1).max(1);
            let val = remaining.split_off(len - val_size);
            let train = remaining;

            let partition = if train.is_empty() {
                FoldPartition::Skipped {
                    reason: "insufficient training groups".to_string(),
                }
            } else {
                FoldPartition::Ready(SplitAssignment::new(train, val, test)?)
            };
            plans.push(FoldPlan { index, partition });
        }

        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("patient_{:02}", i)).collect()
    }

    fn assert_complete_and_disjoint(split: &SplitAssignment, all: &[String]) {
        let mut assigned: Vec<&String> = split
            .train()
            .iter()
            .chain(split.val())
            .chain(split.test())
            .collect();
        assigned.sort();
        let mut expected: Vec<&String> = all.iter().collect();
        expected.sort();
        assert_eq!(assigned, expected);
    }

    #[test]
    fn test_split_five_patients() {
        let all = ids(5);
        let split = GroupSplitter::new(42).split(&all, 0.2, 0.2).unwrap();
        assert_eq!(split.train().len(), 3);
        assert_eq!(split.val().len(), 1);
        assert_eq!(split.test().len(), 1);
        assert_complete_and_disjoint(&split, &all);
    }

    #[test]
    fn test_split_minimum_one_per_holdout() {
        let all = ids(3);
        let split = GroupSplitter::new(1).split(&all, 0.1, 0.1).unwrap();
        assert_eq!(split.train().len(), 1);
        assert_eq!(split.val().len(), 1);
        assert_eq!(split.test().len(), 1);
    }

    #[test]
    fn test_split_insufficient_groups() {
        let result = GroupSplitter::new(42).split(&ids(2), 0.2, 0.2);
        assert!(matches!(
            result,
            Err(ValidationError::InsufficientGroups { available: 2, .. })
        ));
    }

    #[test]
    fn test_split_invalid_ratios() {
        let result = GroupSplitter::new(42).split(&ids(10), 0.5, 0.5);
        assert!(matches!(result, Err(ValidationError::InvalidConfig(_))));
    }

    #[test]
    fn test_split_rejects_duplicates() {
        let mut all = ids(5);
        all.push("patient_00".to_string());
        assert!(matches!(
            GroupSplitter::new(42).split(&all, 0.2, 0.2),
            Err(ValidationError::DuplicateGroup(_))
        ));
    }

    #[test]
    fn test_split_deterministic() {
        let all = ids(20);
        let a = GroupSplitter::new(7).split(&all, 0.2, 0.2).unwrap();
        let b = GroupSplitter::new(7).split(&all, 0.2, 0.2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_role_of() {
        let all = ids(5);
        let split = GroupSplitter::new(42).split(&all, 0.2, 0.2).unwrap();
        for id in &all {
            assert!(split.role_of(id).is_some());
        }
        assert_eq!(split.role_of(&split.test()[0]), Some(SplitRole::Test));
        assert_eq!(split.role_of("missing"), None);
    }

    #[test]
    fn test_assignment_rejects_overlap() {
        let result = SplitAssignment::new(
            vec!["a".to_string()],
            vec!["b".to_string()],
            vec!["a".to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_k_fold_every_group_tested_once() {
        let all = ids(11);
        let plans = GroupSplitter::new(42).k_fold(&all, 5).unwrap();
        assert_eq!(plans.len(), 5);

        let mut tested = Vec::new();
        for plan in &plans {
            if let FoldPartition::Ready(split) = &plan.partition {
                assert_complete_and_disjoint(split, &all);
                tested.extend(split.test().iter().cloned());
            }
        }
        tested.sort();
        let mut expected = all.clone();
        expected.sort();
        assert_eq!(tested, expected);
    }

    #[test]
    fn test_k_fold_remainder_goes_to_last_fold() {
        let plans = GroupSplitter::new(3).k_fold(&ids(11), 5).unwrap();
        let sizes: Vec<usize> = plans
            .iter()
            .map(|p| match &p.partition {
                FoldPartition::Ready(s) => s.test().len(),
                FoldPartition::Skipped { .. } => 0,
            })
            .collect();
        assert_eq!(sizes, vec![2, 2, 2, 2, 3]);
    }

    #[test]
    fn test_k_fold_validation_slice_size() {
        let plans = GroupSplitter::new(3).k_fold(&ids(10), 5).unwrap();
        for plan in plans {
            let index = plan.index;
            let FoldPartition::Ready(split) = plan.partition else {
                panic!("fold {} unexpectedly skipped", index);
            };
            // 8 remaining groups: val = max(1, min(2, 7)) = 2
            assert_eq!(split.val().len(), 2);
            assert_eq!(split.train().len(), 6);
        }
    }

    #[test]
    fn test_k_fold_clamps_to_group_count() {
        let plans = GroupSplitter::new(42).k_fold(&ids(3), 10).unwrap();
        assert_eq!(plans.len(), 3);
        // 2 remaining groups: 1 val, 1 train
        assert!(plans
            .iter()
            .all(|p| matches!(p.partition, FoldPartition::Ready(_))));
    }

    #[test]
    fn test_k_fold_skips_fold_without_train_groups() {
        let plans = GroupSplitter::new(42).k_fold(&ids(2), 2).unwrap();
        assert_eq!(plans.len(), 2);
        assert!(plans
            .iter()
            .all(|p| matches!(p.partition, FoldPartition::Skipped { .. })));
    }

    #[test]
    fn test_k_fold_single_fold_skipped() {
        let plans = GroupSplitter::new(42).k_fold(&ids(4), 1).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(matches!(plans[0].partition, FoldPartition::Skipped { .. }));
    }

    #[test]
    fn test_k_fold_zero_rejected() {
        assert!(GroupSplitter::new(42).k_fold(&ids(4), 0).is_err());
    }

    #[test]
    fn test_k_fold_empty_input() {
        assert!(GroupSplitter::new(42).k_fold(&[], 5).unwrap().is_empty());
    }
}
