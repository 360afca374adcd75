//! Shared helpers for integration tests.
//!
//! For assertion helpers, use `foldwise::testing`.

#![allow(dead_code)]

use std::sync::Arc;

use foldwise::components::{ColumnAdapter, ColumnScorer, Evaluator, FoldComponents, TrainerFactory};
use foldwise::cv::{CrossValidationConfig, Execution};
use foldwise::data::RoleMapping;
use foldwise::partition::Stratification;
use foldwise::testing::SquaredErrorEvaluator;

// Re-export testing utilities for convenience
#[allow(unused_imports)]
pub use foldwise::assert_approx_eq;
#[allow(unused_imports)]
pub use foldwise::testing::{assert_metrics_eq, regression_dataset, DEFAULT_TOLERANCE};

/// Roles of [`regression_dataset`] with the name column bound.
pub fn roles() -> RoleMapping {
    RoleMapping::default().name("Name")
}

/// Components around `trainer` with the squared-error evaluator.
pub fn components(trainer: TrainerFactory) -> FoldComponents {
    components_with(trainer, Arc::new(SquaredErrorEvaluator::default()))
}

pub fn components_with(trainer: TrainerFactory, evaluator: Arc<dyn Evaluator>) -> FoldComponents {
    FoldComponents {
        trainer,
        adapter: Arc::new(ColumnAdapter::new(roles())),
        scorer: Arc::new(ColumnScorer),
        evaluator,
    }
}

/// Config stratified on the uniform `Split` column.
pub fn split_config(n_folds: usize, execution: Execution) -> CrossValidationConfig {
    CrossValidationConfig::builder()
        .n_folds(n_folds)
        .execution(execution)
        .stratification(Stratification::Column("Split".into()))
        .build()
        .expect("valid config")
}
