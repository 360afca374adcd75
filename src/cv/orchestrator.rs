//! K-fold cross-validation driver.
//!
//! The orchestrator resolves configuration and stratification up front,
//! fans one task out per fold, joins results in fold order and routes
//! per-instance output to the aggregator.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::aggregate::{write_json, write_per_fold, AggregateError, MergedView, ResultAggregator};
use crate::components::{ComponentError, ComponentNames, ComponentRegistry, FoldComponents, Predictor};
use crate::data::{Dataset, DatasetError};
use crate::logger::RunLogger;
use crate::metrics::{MetricsSummary, MetricsTable};
use crate::partition::{DatasetPartitioner, PartitionError, Stratification};

use super::config::{ConfigError, CrossValidationConfig, FaultPolicy, OutputMode};
use super::fold::{FoldFault, FoldResult, FoldStage, FoldTask};
use super::scheduler::{FoldScheduler, Scheduler};

// =============================================================================
// Errors
// =============================================================================

/// A fold that failed, with the stage it failed in.
#[derive(Debug)]
pub struct FoldFailure {
    pub fold: usize,
    pub stage: FoldStage,
    pub source: ComponentError,
}

impl fmt::Display for FoldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fold {} failed during {}: {}", self.fold, self.stage, self.source)
    }
}

/// Errors of a cross-validation run.
#[derive(Debug, thiserror::Error)]
pub enum CvError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot partition dataset: {0}")]
    Partition(#[from] PartitionError),

    #[error("cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("fold {fold} failed during {stage}: {source}")]
    Fold {
        fold: usize,
        stage: FoldStage,
        #[source]
        source: ComponentError,
    },

    #[error("{} folds failed; first: {}", .0.len(), .0[0])]
    MultipleFolds(Vec<FoldFailure>),

    #[error("fold {fold} was cancelled")]
    Cancelled { fold: usize },

    #[error("cannot merge fold results: {0}")]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Component(ComponentError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl CvError {
    fn from_failures(mut failures: Vec<FoldFailure>) -> Self {
        if failures.len() == 1 {
            let FoldFailure {
                fold,
                stage,
                source,
            } = failures.remove(0);
            CvError::Fold {
                fold,
                stage,
                source,
            }
        } else {
            CvError::MultipleFolds(failures)
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Per-instance results, routed by [`OutputMode`].
#[derive(Debug, Clone)]
pub enum PerInstanceOutput {
    Collated(MergedView),
    PerFold {
        views: Vec<(usize, Dataset)>,
        /// Written files, when an output path is configured.
        paths: Vec<PathBuf>,
    },
}

/// Everything a cross-validation run produces.
#[derive(Debug, Clone)]
pub struct CrossValidationOutput {
    /// One result per fold, in fold order.
    pub folds: Vec<FoldResult>,
    pub summary: MetricsSummary,
    pub per_instance: Option<PerInstanceOutput>,
    /// Warnings raised during the run.
    pub warnings: Vec<String>,
}

impl CrossValidationOutput {
    /// Per-fold metrics followed by average and standard deviation rows.
    pub fn metrics_dataset(&self) -> Result<Dataset, DatasetError> {
        let tables: Vec<MetricsTable> = self.folds.iter().map(|f| f.metrics.clone()).collect();
        self.summary.to_dataset(&tables)
    }

    /// Metric table of fold `fold`.
    pub fn fold_metrics(&self, fold: usize) -> Option<&MetricsTable> {
        self.folds.get(fold).map(|f| &f.metrics)
    }
}

// =============================================================================
// FoldOrchestrator
// =============================================================================

/// Runs K-fold cross-validation over pluggable components.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use foldwise::components::{ColumnAdapter, ColumnScorer, FoldComponents};
/// use foldwise::cv::{CrossValidationConfig, Execution, FoldOrchestrator};
/// use foldwise::data::RoleMapping;
/// use foldwise::testing::{regression_dataset, MeanTrainer, SquaredErrorEvaluator};
///
/// let config = CrossValidationConfig::builder()
///     .n_folds(4)
///     .execution(Execution::Sequential)
///     .build()
///     .unwrap();
/// let components = FoldComponents {
///     trainer: MeanTrainer::factory(),
///     adapter: Arc::new(ColumnAdapter::new(RoleMapping::default())),
///     scorer: Arc::new(ColumnScorer),
///     evaluator: Arc::new(SquaredErrorEvaluator::default()),
/// };
///
/// let output = FoldOrchestrator::new(config, components)
///     .unwrap()
///     .run(Arc::new(regression_dataset(40)))
///     .unwrap();
/// assert_eq!(output.folds.len(), 4);
/// ```
#[derive(Debug)]
pub struct FoldOrchestrator {
    config: CrossValidationConfig,
    components: FoldComponents,
    scheduler: Scheduler,
}

impl FoldOrchestrator {
    pub fn new(config: CrossValidationConfig, components: FoldComponents) -> Result<Self, CvError> {
        config.validate()?;
        let scheduler = Scheduler::from_execution(config.execution)?;
        Ok(Self {
            config,
            components,
            scheduler,
        })
    }

    /// Resolve components by name.
    ///
    /// Unknown names are configuration errors.
    pub fn from_registry(
        config: CrossValidationConfig,
        registry: &ComponentRegistry,
        names: &ComponentNames,
    ) -> Result<Self, CvError> {
        let components = registry.resolve(names).map_err(|e| match e {
            ComponentError::Unknown { kind, name } => {
                CvError::Config(ConfigError::UnknownComponent { kind, name })
            }
            other => CvError::Component(other),
        })?;
        Self::new(config, components)
    }

    #[inline]
    pub fn config(&self) -> &CrossValidationConfig {
        &self.config
    }

    #[inline]
    pub fn components(&self) -> &FoldComponents {
        &self.components
    }

    /// Cross-validate on `data`.
    pub fn run(&self, data: Arc<Dataset>) -> Result<CrossValidationOutput, CvError> {
        self.run_with(data, None, None)
    }

    /// Cross-validate with optional validation data and a prior predictor.
    ///
    /// Validation data and the prior are only handed to trainers that
    /// support them; otherwise a warning is recorded and they are dropped.
    pub fn run_with(
        &self,
        data: Arc<Dataset>,
        validation: Option<&Dataset>,
        prior: Option<Arc<dyn Predictor>>,
    ) -> Result<CrossValidationOutput, CvError> {
        let config = &self.config;
        let mut logger = RunLogger::new(config.verbosity);

        let stratification = self.resolve_stratification();
        let partitioner = DatasetPartitioner::new(&data, &stratification, config.n_folds)?;

        let sample = (self.components.trainer)();
        let validation = match validation {
            Some(_) if !sample.supports_validation() => {
                logger.warn(format!(
                    "trainer '{}' does not accept validation data; ignoring it",
                    sample.name()
                ));
                None
            }
            other => other,
        };
        let prior = match prior {
            Some(_) if !sample.supports_continued_training() => {
                logger.warn(format!(
                    "trainer '{}' does not support continued training; ignoring the initial predictor",
                    sample.name()
                ));
                None
            }
            other => other,
        };
        drop(sample);

        logger.start_run(config.n_folds, self.scheduler.is_parallel());

        let cancel = AtomicBool::new(false);
        let task = FoldTask {
            data: &data,
            partitioner: &partitioner,
            components: &self.components,
            config,
            validation,
            prior: prior.as_ref(),
            cancel: &cancel,
            logger: &logger,
        };
        let fail_fast = config.fault_policy == FaultPolicy::FailFast;
        let outcomes = self.scheduler.run(config.n_folds, |fold| {
            let outcome = task.run(fold);
            if fail_fast && matches!(outcome, Err(FoldFault::Failed { .. })) {
                cancel.store(true, Ordering::Release);
            }
            outcome
        });

        let folds = collect_outcomes(outcomes, config.fault_policy)?;

        let evaluator = &self.components.evaluator;
        for result in &folds {
            evaluator.print_fold_results(&logger, result.fold, &result.metrics);
        }
        let summary = MetricsSummary::from_folds(folds.iter().map(|f| &f.metrics));
        evaluator.print_overall_results(&logger, &summary);

        let per_instance = if config.per_instance {
            self.route_per_instance(&folds, &mut logger)?
        } else {
            None
        };

        Ok(CrossValidationOutput {
            folds,
            summary,
            per_instance,
            warnings: logger.into_warnings(),
        })
    }

    fn resolve_stratification(&self) -> Stratification {
        match (&self.config.stratification, self.components.adapter.stratification_column()) {
            (Stratification::Auto, Some(column)) => Stratification::Column(column.to_string()),
            (policy, _) => policy.clone(),
        }
    }

    fn route_per_instance(
        &self,
        folds: &[FoldResult],
        logger: &mut RunLogger,
    ) -> Result<Option<PerInstanceOutput>, CvError> {
        let views: Vec<(usize, Dataset)> = folds
            .iter()
            .filter_map(|f| f.per_instance.clone().map(|d| (f.fold, d)))
            .collect();
        if views.is_empty() {
            return Ok(None);
        }

        let mut aggregator = ResultAggregator::new(self.config.fold_index_column);
        if let Some(name) = &self.components.adapter.roles().name {
            aggregator = aggregator.with_anchor(name.clone());
        }

        let output = match self.config.output_mode {
            OutputMode::Collated => {
                let merged = aggregator.merge(&views, logger)?;
                if let Some(path) = &self.config.output_path {
                    write_json(&merged.data, path)?;
                }
                PerInstanceOutput::Collated(merged)
            }
            OutputMode::PerFold => {
                let views = aggregator.per_fold(&views);
                let paths = match &self.config.output_path {
                    Some(base) => write_per_fold(&views, base)?,
                    None => Vec::new(),
                };
                PerInstanceOutput::PerFold { views, paths }
            }
        };
        Ok(Some(output))
    }
}

/// Join fold outcomes under `policy`.
///
/// Cancelled folds are never reported on their own; they only exist because
/// another fold failed.
fn collect_outcomes(
    outcomes: Vec<Result<FoldResult, FoldFault>>,
    policy: FaultPolicy,
) -> Result<Vec<FoldResult>, CvError> {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    let mut first_cancelled = None;

    for (fold, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(result),
            Err(FoldFault::Failed { stage, source }) => failures.push(FoldFailure {
                fold,
                stage,
                source,
            }),
            Err(FoldFault::Cancelled) => {
                first_cancelled.get_or_insert(fold);
            }
        }
    }

    if !failures.is_empty() {
        return Err(match policy {
            FaultPolicy::FailFast => CvError::from_failures(vec![failures.remove(0)]),
            FaultPolicy::CollectAll => CvError::from_failures(failures),
        });
    }
    if let Some(fold) = first_cancelled {
        return Err(CvError::Cancelled { fold });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ColumnAdapter, ColumnScorer};
    use crate::cv::Execution;
    use crate::data::RoleMapping;
    use crate::testing::{regression_dataset, FailingTrainer, MeanTrainer, SquaredErrorEvaluator};

    fn components(trainer: crate::components::TrainerFactory) -> FoldComponents {
        FoldComponents {
            trainer,
            adapter: Arc::new(ColumnAdapter::new(RoleMapping::default().name("Name"))),
            scorer: Arc::new(ColumnScorer),
            evaluator: Arc::new(SquaredErrorEvaluator::default()),
        }
    }

    fn failure() -> Result<FoldResult, FoldFault> {
        Err(FoldFault::Failed {
            stage: FoldStage::Train,
            source: ComponentError::failed("trainer", "boom"),
        })
    }

    #[test]
    fn fail_fast_reports_lowest_failure() {
        let outcomes = vec![Err(FoldFault::Cancelled), failure(), failure()];
        match collect_outcomes(outcomes, FaultPolicy::FailFast) {
            Err(CvError::Fold { fold: 1, stage: FoldStage::Train, .. }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn collect_all_reports_every_failure() {
        let outcomes = vec![failure(), failure()];
        match collect_outcomes(outcomes, FaultPolicy::CollectAll) {
            Err(CvError::MultipleFolds(f)) => {
                assert_eq!(f.iter().map(|f| f.fold).collect::<Vec<_>>(), vec![0, 1]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cancellation_alone_is_reported() {
        let outcomes = vec![Err(FoldFault::Cancelled)];
        assert!(matches!(
            collect_outcomes(outcomes, FaultPolicy::FailFast),
            Err(CvError::Cancelled { fold: 0 })
        ));
    }

    #[test]
    fn sequential_run_produces_one_result_per_fold() {
        let config = CrossValidationConfig::builder()
            .n_folds(3)
            .execution(Execution::Sequential)
            .build()
            .unwrap();
        let out = FoldOrchestrator::new(config, components(MeanTrainer::factory()))
            .unwrap()
            .run(Arc::new(regression_dataset(30)))
            .unwrap();

        assert_eq!(out.folds.len(), 3);
        let rows: usize = out.folds.iter().map(|f| f.n_test_rows).sum();
        assert_eq!(rows, 30);
        assert!(out.summary.get("L2").is_some());
        assert!(out.per_instance.is_none());

        let metrics = out.metrics_dataset().unwrap();
        assert_eq!(metrics.n_rows(), 5);
    }

    #[test]
    fn auto_stratification_uses_adapter_column() {
        let adapter = ColumnAdapter::new(RoleMapping::default()).with_stratification("Split");
        let comps = FoldComponents {
            adapter: Arc::new(adapter),
            ..components(MeanTrainer::factory())
        };
        let orchestrator = FoldOrchestrator::new(CrossValidationConfig::default(), comps).unwrap();
        assert_eq!(
            orchestrator.resolve_stratification(),
            Stratification::Column("Split".into())
        );
    }

    #[test]
    fn unknown_component_is_a_config_error() {
        let registry = ComponentRegistry::new();
        let names = ComponentNames::new("nope", "columns", "l2");
        let err = FoldOrchestrator::from_registry(CrossValidationConfig::default(), &registry, &names)
            .unwrap_err();
        assert!(matches!(
            err,
            CvError::Config(ConfigError::UnknownComponent { .. })
        ));
    }

    #[test]
    fn failing_fold_aborts_the_run() {
        let config = CrossValidationConfig::builder()
            .n_folds(4)
            .execution(Execution::Sequential)
            .stratification(Stratification::Column("Split".into()))
            .build()
            .unwrap();
        // Label 0 sits in fold 0's test set, so fold 0 trains without it.
        let trainer = FailingTrainer::new(vec![0.0]).into_factory();
        let err = FoldOrchestrator::new(config, components(trainer))
            .unwrap()
            .run(Arc::new(regression_dataset(20)))
            .unwrap_err();
        assert!(matches!(err, CvError::Fold { fold: 0, stage: FoldStage::Train, .. }));
    }
}
