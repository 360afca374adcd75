//! Cross-validation configuration with builder pattern.
//!
//! ```
//! use foldwise::cv::{CrossValidationConfig, Execution};
//!
//! // All defaults: 2 folds, parallel on the global pool
//! let config = CrossValidationConfig::builder().build().unwrap();
//!
//! let config = CrossValidationConfig::builder()
//!     .n_folds(5)
//!     .execution(Execution::Sequential)
//!     .per_instance(true)
//!     .model_path("models/model.json")
//!     .build()
//!     .unwrap();
//! ```

use std::path::PathBuf;

use bon::Builder;

use crate::logger::Verbosity;
use crate::partition::Stratification;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors detected before any fold runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("number of folds must be at least 2, got {0}")]
    TooFewFolds(usize),

    #[error("stratification column name is empty")]
    EmptyStratificationColumn,

    #[error("unknown {kind} '{name}'")]
    UnknownComponent { kind: &'static str, name: String },
}

// =============================================================================
// Switches
// =============================================================================

/// How folds are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// One fold after another, in fold order.
    Sequential,
    /// One task per fold.
    ///
    /// - `0` = global rayon pool
    /// - `1` = sequential
    /// - `n > 1` = dedicated pool with `n` threads
    Parallel { n_threads: usize },
}

impl Default for Execution {
    fn default() -> Self {
        Execution::Parallel { n_threads: 0 }
    }
}

impl Execution {
    /// Returns `true` if folds may run concurrently.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Execution::Parallel { n_threads } if n_threads != 1)
    }
}

/// What happens when a fold fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Cancel outstanding folds and report the lowest-indexed failure.
    #[default]
    FailFast,
    /// Run every fold and report all failures.
    CollectAll,
}

/// Per-instance output routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Merge all folds into one view.
    #[default]
    Collated,
    /// Keep one view (and one file) per fold.
    PerFold,
}

/// Feature normalization before training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Normalize if the trainer asks for it.
    #[default]
    Auto,
    Yes,
    No,
}

impl NormalizeMode {
    pub fn resolve(self, trainer_needs: bool) -> bool {
        match self {
            NormalizeMode::Auto => trainer_needs,
            NormalizeMode::Yes => true,
            NormalizeMode::No => false,
        }
    }
}

// =============================================================================
// CrossValidationConfig
// =============================================================================

/// Cross-validation run configuration.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct CrossValidationConfig {
    /// Number of folds. Default: 2.
    #[builder(default = 2)]
    pub n_folds: usize,

    /// Fold scheduling. Default: parallel on the global pool.
    #[builder(default)]
    pub execution: Execution,

    /// Default: fail fast.
    #[builder(default)]
    pub fault_policy: FaultPolicy,

    /// How rows are assigned to folds. Default: automatic.
    #[builder(default)]
    pub stratification: Stratification,

    #[builder(default)]
    pub normalize: NormalizeMode,

    /// Collect per-instance results from the evaluator.
    #[builder(default)]
    pub per_instance: bool,

    #[builder(default)]
    pub output_mode: OutputMode,

    /// Add a `FoldIndex` column to collated per-instance output. Default: true.
    #[builder(default = true)]
    pub fold_index_column: bool,

    /// Base path for fold model artifacts. `None` skips persistence.
    #[builder(into)]
    pub model_path: Option<PathBuf>,

    /// Path for per-instance output files. `None` keeps results in memory.
    #[builder(into)]
    pub output_path: Option<PathBuf>,

    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: cross_validation_config_builder::IsComplete> CrossValidationConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// - `n_folds < 2`
    /// - an empty stratification column name
    pub fn build(self) -> Result<CrossValidationConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl CrossValidationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.n_folds < 2 {
            return Err(ConfigError::TooFewFolds(self.n_folds));
        }
        if matches!(&self.stratification, Stratification::Column(name) if name.is_empty()) {
            return Err(ConfigError::EmptyStratificationColumn);
        }
        Ok(())
    }
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}
