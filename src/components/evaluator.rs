use super::{ComponentError, ScoredData};
use crate::data::Dataset;
use crate::logger::RunLogger;
use crate::metrics::{MetricsSummary, MetricsTable};

/// Computes metrics from scored test data.
///
/// Evaluators are shared by every fold and must not keep per-fold state.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Named metrics for one fold.
    fn evaluate(&self, scored: &ScoredData) -> Result<MetricsTable, ComponentError>;

    /// Row-level results for one fold, if this evaluator produces them.
    fn per_instance(&self, _scored: &ScoredData) -> Result<Option<Dataset>, ComponentError> {
        Ok(None)
    }

    /// Report one fold's metrics. Called in fold order after all folds ran.
    fn print_fold_results(&self, logger: &RunLogger, fold: usize, metrics: &MetricsTable) {
        logger.log_fold_metrics(fold, metrics);
    }

    /// Report the summary over all folds. Called once per run.
    fn print_overall_results(&self, logger: &RunLogger, summary: &MetricsSummary) {
        logger.log_summary(summary);
    }
}
