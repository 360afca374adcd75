//! Per-instance result aggregation.
//!
//! Fold evaluators produce one dataset each. Collated output merges them
//! into a single view:
//!
//! 1. hidden columns are dropped
//! 2. vector columns with drifting widths become variable-length
//! 3. key columns are unified into one key space and emitted as text
//! 4. rows are concatenated in fold order, optionally tagged with a
//!    `FoldIndex` column

mod merge;
mod reconcile;

pub use merge::{write_json, write_per_fold, MergedView, ResultAggregator, FOLD_INDEX_COLUMN};
pub use reconcile::{make_length_tolerant, reconcile_keys, scan_variable_length};

use crate::data::DatasetError;

/// Errors raised while merging fold results.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("fold {fold} is missing column '{column}'")]
    MissingColumn { fold: usize, column: String },

    #[error("fold {fold} has unexpected column '{column}'")]
    ExtraColumn { fold: usize, column: String },

    #[error("column '{column}' is {expected} in the first fold but {found} in fold {fold}")]
    ColumnType {
        column: String,
        fold: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
