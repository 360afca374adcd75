//! One fold: partition, adapt, train, score, persist, evaluate.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::components::{ComponentError, FoldComponents, Predictor, TrainContext};
use crate::data::{DataView, Dataset, RoleMapping, Schema};
use crate::logger::RunLogger;
use crate::metrics::MetricsTable;
use crate::partition::DatasetPartitioner;

use super::config::CrossValidationConfig;
use super::naming::fold_artifact_path;

/// Stage of a fold's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStage {
    Partition,
    Adapt,
    Train,
    Score,
    Persist,
    Evaluate,
}

impl fmt::Display for FoldStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FoldStage::Partition => "partition",
            FoldStage::Adapt => "adapt",
            FoldStage::Train => "train",
            FoldStage::Score => "score",
            FoldStage::Persist => "persist",
            FoldStage::Evaluate => "evaluate",
        })
    }
}

/// Output of one fold.
#[derive(Debug, Clone)]
pub struct FoldResult {
    pub fold: usize,
    pub metrics: MetricsTable,
    /// Schema of the scored test data.
    pub scored_schema: Schema,
    /// Row-level evaluator output, when requested and produced.
    pub per_instance: Option<Dataset>,
    /// Schema of the prepared training data.
    pub train_schema: Schema,
    pub train_roles: RoleMapping,
    pub model: Arc<dyn Predictor>,
    /// Where the model was written, if persisted.
    pub model_path: Option<PathBuf>,
    pub n_train_rows: usize,
    pub n_test_rows: usize,
}

/// Why a fold did not produce a result.
#[derive(Debug)]
pub(crate) enum FoldFault {
    Failed {
        stage: FoldStage,
        source: ComponentError,
    },
    /// Stopped at a stage boundary after another fold failed.
    Cancelled,
}

fn at<E: Into<ComponentError>>(stage: FoldStage) -> impl FnOnce(E) -> FoldFault {
    move |e| FoldFault::Failed {
        stage,
        source: e.into(),
    }
}

/// Shared, read-only inputs of every fold task.
pub(crate) struct FoldTask<'a> {
    pub data: &'a Arc<Dataset>,
    pub partitioner: &'a DatasetPartitioner,
    pub components: &'a FoldComponents,
    pub config: &'a CrossValidationConfig,
    /// Already filtered by trainer capability.
    pub validation: Option<&'a Dataset>,
    /// Already filtered by trainer capability.
    pub prior: Option<&'a Arc<dyn Predictor>>,
    pub cancel: &'a AtomicBool,
    pub logger: &'a RunLogger,
}

impl FoldTask<'_> {
    fn enter(&self, fold: usize, stage: FoldStage) -> Result<(), FoldFault> {
        if self.cancel.load(Ordering::Acquire) {
            return Err(FoldFault::Cancelled);
        }
        self.logger.debug(&format!("fold {fold}: {stage}"));
        Ok(())
    }

    pub fn run(&self, fold: usize) -> Result<FoldResult, FoldFault> {
        let FoldComponents {
            trainer: new_trainer,
            adapter,
            scorer,
            evaluator,
        } = self.components;

        self.enter(fold, FoldStage::Partition)?;
        let split = self
            .partitioner
            .split(fold)
            .map_err(|e| at(FoldStage::Partition)(ComponentError::failed("partitioner", e.to_string())))?;
        let train_view = DataView::new(Arc::clone(self.data), split.train.into_indices())
            .map_err(at(FoldStage::Partition))?;
        let test_view = DataView::new(Arc::clone(self.data), split.test.into_indices())
            .map_err(at(FoldStage::Partition))?;

        self.enter(fold, FoldStage::Adapt)?;
        let mut trainer = new_trainer();
        let normalize = self.config.normalize.resolve(trainer.needs_normalization());
        let train_data = train_view.materialize().map_err(at(FoldStage::Adapt))?;
        let (train, pipeline) = adapter
            .fit(train_data, normalize)
            .map_err(at(FoldStage::Adapt))?;
        let test_data = test_view.materialize().map_err(at(FoldStage::Adapt))?;
        let test = pipeline.apply(test_data).map_err(at(FoldStage::Adapt))?;
        let validation = self
            .validation
            .map(|v| pipeline.apply(v.clone()))
            .transpose()
            .map_err(at(FoldStage::Adapt))?;

        self.enter(fold, FoldStage::Train)?;
        let ctx = TrainContext {
            train: &train,
            validation: validation.as_ref(),
            prior: self.prior,
        };
        let model = trainer.train(ctx).map_err(at(FoldStage::Train))?;

        self.enter(fold, FoldStage::Score)?;
        let bound = scorer
            .bind(Arc::clone(&model), &test.data().schema())
            .map_err(at(FoldStage::Score))?;
        let scored = bound.score(test).map_err(at(FoldStage::Score))?;

        let model_path = match &self.config.model_path {
            Some(base) => {
                self.enter(fold, FoldStage::Persist)?;
                let path = fold_artifact_path(base, fold);
                save_model(model.as_ref(), &path).map_err(at(FoldStage::Persist))?;
                Some(path)
            }
            None => None,
        };

        self.enter(fold, FoldStage::Evaluate)?;
        let metrics = evaluator.evaluate(&scored).map_err(at(FoldStage::Evaluate))?;
        let per_instance = if self.config.per_instance {
            evaluator
                .per_instance(&scored)
                .map_err(at(FoldStage::Evaluate))?
        } else {
            None
        };

        Ok(FoldResult {
            fold,
            metrics,
            scored_schema: bound.output_schema().clone(),
            per_instance,
            train_schema: train.data().schema(),
            train_roles: train.roles().clone(),
            model,
            model_path,
            n_train_rows: train_view.n_rows(),
            n_test_rows: test_view.n_rows(),
        })
    }
}

fn save_model(model: &dyn Predictor, path: &std::path::Path) -> Result<(), ComponentError> {
    let mut writer = BufWriter::new(File::create(path)?);
    model.save(&mut writer)?;
    writer.flush()?;
    Ok(())
}
