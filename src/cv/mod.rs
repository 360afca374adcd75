//! K-fold cross-validation.
//!
//! - [`CrossValidationConfig`]: validated run configuration
//! - [`FoldOrchestrator`]: runs one task per fold and joins the results
//! - [`FoldScheduler`]: sequential or rayon thread-pool fold execution
//! - [`fold_artifact_path`]: `name.fold{k:03}.ext` artifact naming

mod config;
mod fold;
mod naming;
mod orchestrator;
mod scheduler;

pub use config::{
    ConfigError, CrossValidationConfig, Execution, FaultPolicy, NormalizeMode, OutputMode,
};
pub use fold::{FoldResult, FoldStage};
pub use naming::fold_artifact_path;
pub use orchestrator::{
    CrossValidationOutput, CvError, FoldFailure, FoldOrchestrator, PerInstanceOutput,
};
pub use scheduler::{FoldScheduler, Scheduler, SequentialScheduler, ThreadPoolScheduler};
