//! Pluggable fold stages.
//!
//! The orchestrator never trains, scores or evaluates anything itself. It
//! drives these narrow capability traits:
//!
//! - [`Trainer`] produces a [`Predictor`] from role-mapped training data
//! - [`Scorer`] binds a predictor to a test schema and scores rows
//! - [`Evaluator`] turns scored data into metrics and per-instance results
//! - [`DataAdapter`] binds column roles and fits pre-transforms
//!
//! Implementations are looked up by name through a [`ComponentRegistry`].

mod adapter;
mod evaluator;
mod registry;
mod scorer;
mod trainer;

pub use adapter::{
    ColumnAdapter, DataAdapter, FittedPipeline, FittedTransform, MaxAbsNormalizer, Transform,
};
pub use evaluator::Evaluator;
pub use registry::{ComponentNames, ComponentRegistry, FoldComponents};
pub use scorer::{BoundScorer, ColumnScorer, ScoredData, Scorer};
pub use trainer::{Predictor, TrainContext, Trainer, TrainerFactory};

use crate::data::DatasetError;

/// Errors raised by pluggable components.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("{component}: {message}")]
    Failed { component: String, message: String },

    #[error("unknown {kind} '{name}'")]
    Unknown { kind: &'static str, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ComponentError {
    /// Failure reported by a named component.
    pub fn failed(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            component: component.into(),
            message: message.into(),
        }
    }
}
