//! Run logging with verbosity gating.
//!
//! Messages go through `tracing`, so the host application decides where they
//! end up. Warnings are also kept on the logger so they can be returned to
//! the caller with the run output.

use serde::{Deserialize, Serialize};

use crate::metrics::{MetricsSummary, MetricsTable};

/// Verbosity level for run output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Warnings only.
    #[default]
    Warning,
    /// Per-fold progress and metrics.
    Info,
    /// Stage-level detail.
    Debug,
}

/// Logger for one cross-validation run.
#[derive(Debug, Clone, Default)]
pub struct RunLogger {
    verbosity: Verbosity,
    warnings: Vec<String>,
}

impl RunLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            warnings: Vec::new(),
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity >= level
    }

    /// Record and emit a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.enabled(Verbosity::Warning) {
            tracing::warn!("{message}");
        }
        self.warnings.push(message);
    }

    pub fn info(&self, message: &str) {
        if self.enabled(Verbosity::Info) {
            tracing::info!("{message}");
        }
    }

    pub fn debug(&self, message: &str) {
        if self.enabled(Verbosity::Debug) {
            tracing::debug!("{message}");
        }
    }

    pub fn start_run(&self, n_folds: usize, parallel: bool) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(n_folds, parallel, "starting cross-validation");
        }
    }

    pub fn log_fold_metrics(&self, fold: usize, metrics: &MetricsTable) {
        if self.enabled(Verbosity::Info) {
            tracing::info!(fold, "{metrics}");
        }
    }

    pub fn log_summary(&self, summary: &MetricsSummary) {
        if self.enabled(Verbosity::Info) {
            for (name, stats) in summary.iter() {
                tracing::info!(
                    metric = name.as_str(),
                    mean = stats.mean,
                    std_dev = stats.std_dev,
                    "overall"
                );
            }
        }
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ordering() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Info > Verbosity::Warning);
        assert!(Verbosity::Warning > Verbosity::Silent);
        assert_eq!(Verbosity::default(), Verbosity::Warning);
    }

    #[test]
    fn warnings_are_recorded_even_when_silent() {
        let mut logger = RunLogger::new(Verbosity::Silent);
        logger.warn("careful");
        assert_eq!(logger.warnings(), &["careful".to_string()]);
        assert!(!logger.enabled(Verbosity::Warning));
    }
}
