use std::fmt;
use std::io::Write;
use std::sync::Arc;

use super::ComponentError;
use crate::data::{Column, ColumnDescriptor, RoleMappedData};

/// A trained model.
///
/// Predictors are shared read-only between the scorer, the persistence step
/// and (for continued training) the next trainer.
pub trait Predictor: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Columns produced by [`predict`](Predictor::predict).
    fn output_columns(&self) -> Vec<ColumnDescriptor>;

    /// Compute output columns for every row of `data`.
    fn predict(&self, data: &RoleMappedData) -> Result<Vec<Column>, ComponentError>;

    /// Serialize the model.
    fn save(&self, writer: &mut dyn Write) -> Result<(), ComponentError>;
}

/// Inputs to one training call.
#[derive(Clone, Copy)]
pub struct TrainContext<'a> {
    pub train: &'a RoleMappedData,
    /// Only set for trainers that support validation data.
    pub validation: Option<&'a RoleMappedData>,
    /// Only set for trainers that support continued training.
    pub prior: Option<&'a Arc<dyn Predictor>>,
}

impl<'a> TrainContext<'a> {
    pub fn new(train: &'a RoleMappedData) -> Self {
        Self {
            train,
            validation: None,
            prior: None,
        }
    }
}

/// A learning algorithm. One fresh instance is created per fold.
pub trait Trainer: Send {
    fn name(&self) -> &str;

    /// Whether a held-out validation set can be used.
    fn supports_validation(&self) -> bool {
        false
    }

    /// Whether training can start from a prior predictor.
    fn supports_continued_training(&self) -> bool {
        false
    }

    /// Whether features should be normalized when normalization is automatic.
    fn needs_normalization(&self) -> bool {
        false
    }

    fn train(&mut self, ctx: TrainContext<'_>) -> Result<Arc<dyn Predictor>, ComponentError>;
}

/// Creates trainer instances.
pub type TrainerFactory = Arc<dyn Fn() -> Box<dyn Trainer> + Send + Sync>;
