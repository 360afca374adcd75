//! Stratified fold assignment.
//!
//! Every row is mapped to exactly one fold from its split key, once, when the
//! partitioner is built. Fold `i`'s test set is the rows mapped to `i`; its
//! train set is the complement. Both keep ascending row order.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use super::rows::Partition;
use crate::data::{ColumnValues, Dataset};

/// Cardinality of the hashed key space.
pub const HASH_SPACE: u32 = 1 << 30;

/// How rows are assigned to folds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stratification {
    /// Group index when the dataset has groups, hashed row counter otherwise.
    #[default]
    Auto,
    /// Use the named column as split key.
    Column(String),
    /// Hashed row counter.
    None,
}

/// Partitioning errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    #[error("number of folds must be at least 2, got {0}")]
    TooFewFolds(usize),

    #[error("stratification column '{0}' not found")]
    UnknownColumn(String),

    #[error("stratification column '{column}' has unsupported type {kind}")]
    Unsupported { column: String, kind: &'static str },

    #[error("stratification column '{column}' has a non-finite value at row {row}")]
    NonFiniteKey { column: String, row: usize },

    #[error("fold {fold} out of range for {n_folds} folds")]
    FoldOutOfRange { fold: usize, n_folds: usize },
}

/// Per-row split key.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitKey {
    /// Values assumed uniform in [0, 1).
    Continuous(Vec<f64>),
    /// 0-based ordinals in `0..cardinality`.
    Key { ordinals: Vec<u32>, cardinality: u32 },
}

impl SplitKey {
    /// Resolve the split key for `data` under `policy`.
    pub fn resolve(data: &Dataset, policy: &Stratification) -> Result<Self, PartitionError> {
        match policy {
            Stratification::Column(name) => Self::from_column(data, name),
            Stratification::Auto if data.has_groups() => Ok(Self::hashed(
                data.row_groups().into_iter().map(u64::from),
            )),
            Stratification::Auto | Stratification::None => {
                Ok(Self::hashed(0..data.n_rows() as u64))
            }
        }
    }

    fn from_column(data: &Dataset, name: &str) -> Result<Self, PartitionError> {
        let col = data
            .column(name)
            .ok_or_else(|| PartitionError::UnknownColumn(name.to_string()))?;

        match col.values() {
            ColumnValues::Numeric(values) => {
                if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                    return Err(PartitionError::NonFiniteKey {
                        column: name.to_string(),
                        row,
                    });
                }
                Ok(SplitKey::Continuous(values.clone()))
            }
            ColumnValues::Key { keys, names } => Ok(SplitKey::Key {
                // Missing keys share ordinal 0 with the first key.
                ordinals: keys.iter().map(|&k| k.saturating_sub(1)).collect(),
                cardinality: names.len().max(1) as u32,
            }),
            ColumnValues::Text(values) => Ok(SplitKey::Key {
                ordinals: values.iter().map(|s| hash30(s)).collect(),
                cardinality: HASH_SPACE,
            }),
            other => Err(PartitionError::Unsupported {
                column: name.to_string(),
                kind: other.type_name(),
            }),
        }
    }

    fn hashed(values: impl Iterator<Item = u64>) -> Self {
        SplitKey::Key {
            ordinals: values.map(|v| hash30(&v)).collect(),
            cardinality: HASH_SPACE,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            SplitKey::Continuous(v) => v.len(),
            SplitKey::Key { ordinals, .. } => ordinals.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold of every row.
    pub fn assign(&self, n_folds: usize) -> Vec<u32> {
        match self {
            SplitKey::Continuous(values) => values
                .iter()
                .map(|&v| continuous_fold(v, n_folds))
                .collect(),
            SplitKey::Key {
                ordinals,
                cardinality,
            } => ordinals
                .iter()
                .map(|&k| key_fold(k, *cardinality, n_folds))
                .collect(),
        }
    }
}

/// Fold of a value in [0, 1]; the last interval is closed on the right.
///
/// Values below 0 land in fold 0 and values above 1 in the last fold.
#[inline]
pub fn continuous_fold(value: f64, n_folds: usize) -> u32 {
    let bucket = (value * n_folds as f64).floor();
    bucket.clamp(0.0, (n_folds - 1) as f64) as u32
}

/// Fold of a key ordinal: the ordinal range is cut into equal contiguous parts.
#[inline]
pub fn key_fold(ordinal: u32, cardinality: u32, n_folds: usize) -> u32 {
    let fold = u64::from(ordinal) * n_folds as u64 / u64::from(cardinality.max(1));
    fold.min(n_folds as u64 - 1) as u32
}

/// 30-bit hash of a value.
#[inline]
pub fn hash30<T: Hash + ?Sized>(value: &T) -> u32 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    (hasher.finish() >> 34) as u32
}

/// Train/test rows of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub fold: usize,
    pub train: Partition,
    pub test: Partition,
}

/// Assigns rows to `n_folds` folds and produces complementary train/test splits.
#[derive(Debug, Clone)]
pub struct DatasetPartitioner {
    fold_of: Vec<u32>,
    n_folds: usize,
}

impl DatasetPartitioner {
    /// Resolve the split key and assign every row to a fold.
    pub fn new(
        data: &Dataset,
        policy: &Stratification,
        n_folds: usize,
    ) -> Result<Self, PartitionError> {
        if n_folds < 2 {
            return Err(PartitionError::TooFewFolds(n_folds));
        }
        let key = SplitKey::resolve(data, policy)?;
        Ok(Self::from_key(&key, n_folds))
    }

    /// Build from an already resolved split key.
    ///
    /// # Panics
    ///
    /// Panics if `n_folds < 2`.
    pub fn from_key(key: &SplitKey, n_folds: usize) -> Self {
        assert!(n_folds >= 2, "n_folds must be at least 2");
        Self {
            fold_of: key.assign(n_folds),
            n_folds,
        }
    }

    #[inline]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.fold_of.len()
    }

    /// Fold assigned to each row.
    pub fn fold_of(&self) -> &[u32] {
        &self.fold_of
    }

    /// Number of test rows per fold.
    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_folds];
        for &f in &self.fold_of {
            sizes[f as usize] += 1;
        }
        sizes
    }

    /// Train and test rows for `fold`.
    pub fn split(&self, fold: usize) -> Result<FoldSplit, PartitionError> {
        if fold >= self.n_folds {
            return Err(PartitionError::FoldOutOfRange {
                fold,
                n_folds: self.n_folds,
            });
        }
        let (test, train): (Vec<u32>, Vec<u32>) = (0..self.fold_of.len() as u32)
            .partition(|&row| self.fold_of[row as usize] as usize == fold);
        Ok(FoldSplit {
            fold,
            train: Partition::new(train, 1),
            test: Partition::new(test, 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(0.199, 0)]
    #[case(0.2, 1)]
    #[case(0.999, 4)]
    #[case(1.0, 4)]
    #[case(-0.3, 0)]
    #[case(7.0, 4)]
    fn test_continuous_fold(#[case] value: f64, #[case] expected: u32) {
        assert_eq!(continuous_fold(value, 5), expected);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(4, 10, 1)]
    #[case(9, 10, 4)]
    #[case(0, 1, 0)]
    fn test_key_fold(#[case] ordinal: u32, #[case] cardinality: u32, #[case] expected: u32) {
        assert_eq!(key_fold(ordinal, cardinality, 5), expected);
    }

    #[test]
    fn test_hash30_range() {
        for i in 0..1000u64 {
            assert!(hash30(&i) < HASH_SPACE);
        }
        assert_eq!(hash30("abc"), hash30("abc"));
    }

    #[test]
    fn test_too_few_folds() {
        let ds = Dataset::empty(3);
        assert_eq!(
            DatasetPartitioner::new(&ds, &Stratification::None, 1).unwrap_err(),
            PartitionError::TooFewFolds(1)
        );
    }

    #[test]
    fn test_unknown_column() {
        let ds = Dataset::empty(3);
        let err =
            DatasetPartitioner::new(&ds, &Stratification::Column("s".into()), 3).unwrap_err();
        assert_eq!(err, PartitionError::UnknownColumn("s".into()));
    }

    #[test]
    fn test_nan_key_rejected() {
        let ds = Dataset::new(vec![Column::numeric("s", vec![0.1, f64::NAN])]).unwrap();
        let err =
            DatasetPartitioner::new(&ds, &Stratification::Column("s".into()), 2).unwrap_err();
        assert!(matches!(err, PartitionError::NonFiniteKey { row: 1, .. }));
    }

    #[test]
    fn test_vector_key_rejected() {
        let ds = Dataset::new(vec![Column::numeric_vector("s", 2, vec![0.0; 4]).unwrap()]).unwrap();
        let err =
            DatasetPartitioner::new(&ds, &Stratification::Column("s".into()), 2).unwrap_err();
        assert!(matches!(err, PartitionError::Unsupported { .. }));
    }

    #[test]
    fn test_key_column_contiguous_ordinals() {
        let names: Vec<String> = (0..4).map(|i| format!("k{i}")).collect();
        let ds = Dataset::new(vec![
            Column::key("s", vec![1, 2, 3, 4, 0], names).unwrap(),
        ])
        .unwrap();
        let p = DatasetPartitioner::new(&ds, &Stratification::Column("s".into()), 2).unwrap();
        assert_eq!(p.fold_of(), &[0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_text_column_hashes_to_folds() {
        let ids: Vec<String> = (0..100).map(|i| format!("id{}", i % 40)).collect();
        let ds = Dataset::new(vec![Column::text("s", ids.clone())]).unwrap();
        let policy = Stratification::Column("s".into());
        let p = DatasetPartitioner::new(&ds, &policy, 5).unwrap();

        // Deterministic across partitioner instances.
        let again = DatasetPartitioner::new(&ds, &policy, 5).unwrap();
        assert_eq!(p.fold_of(), again.fold_of());

        for (row, id) in ids.iter().enumerate() {
            assert_eq!(p.fold_of()[row], key_fold(hash30(id.as_str()), HASH_SPACE, 5));
            assert_eq!(p.fold_of()[row], p.fold_of()[row % 40]);
        }

        let sizes = p.fold_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 100);
        let mut seen = vec![0; 100];
        for fold in 0..5 {
            for &r in p.split(fold).unwrap().test.indices() {
                seen[r as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_split_complements() {
        let ds = Dataset::empty(50);
        let p = DatasetPartitioner::new(&ds, &Stratification::None, 3).unwrap();
        let mut seen = vec![0; 50];
        for fold in 0..3 {
            let s = p.split(fold).unwrap();
            assert_eq!(s.train.len() + s.test.len(), 50);
            for &r in s.test.indices() {
                seen[r as usize] += 1;
                assert!(!s.train.contains(r));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
        assert!(p.split(3).is_err());
    }

    #[test]
    fn test_groups_stay_together() {
        let ds = Dataset::empty(12).with_groups(vec![0, 3, 5, 9, 12]).unwrap();
        let p = DatasetPartitioner::new(&ds, &Stratification::Auto, 2).unwrap();
        for g in 0..ds.n_groups() {
            let folds: Vec<u32> = ds.group_range(g).map(|r| p.fold_of()[r]).collect();
            assert!(folds.windows(2).all(|w| w[0] == w[1]));
        }
    }
}
