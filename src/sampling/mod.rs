//! Randomized bag / out-of-bag partitioning for ensemble members.

mod bagging;
mod ensemble;

pub use bagging::{
    next_group_bag, next_row_bag, scale_ensemble_leaves, Bag, BagMode, BagRng, BaggingError,
    BaggingParams, BaggingPartitionProvider, GroupSplit,
};
pub use ensemble::BaggedForestBuilder;
