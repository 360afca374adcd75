//! Row partitioning.
//!
//! [`Partition`] is the shared bucket type; [`DatasetPartitioner`] assigns
//! rows to cross-validation folds from a stratification key.

mod rows;
mod stratify;

pub use rows::{LeafId, Partition};
pub use stratify::{
    continuous_fold, hash30, key_fold, DatasetPartitioner, FoldSplit, PartitionError, SplitKey,
    Stratification, HASH_SPACE,
};
