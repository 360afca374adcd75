//! foldwise: K-fold cross-validation and bagging partitioners for tabular learners.
//!
//! The crate drives pluggable trainers, scorers and evaluators through
//! independent cross-validation folds, and provides the row partitioning
//! used by bagged tree ensembles.
//!
//! # Key Types
//!
//! - [`cv::FoldOrchestrator`] - runs K folds, sequentially or on a thread pool
//! - [`partition::DatasetPartitioner`] - stratified fold assignment
//! - [`sampling::BaggingPartitionProvider`] - seeded bag / out-of-bag draws
//! - [`aggregate::ResultAggregator`] - merges per-fold result tables
//! - [`data::Dataset`] - immutable columnar table shared by all folds
//!
//! # Bagging
//!
//! ```
//! use foldwise::data::{Column, Dataset};
//! use foldwise::sampling::{BaggingParams, BaggingPartitionProvider};
//!
//! let data = Dataset::new(vec![Column::numeric("x", vec![0.0; 100])]).unwrap();
//! let params = BaggingParams::builder().train_fraction(0.5).seed(7).build();
//! let mut provider = BaggingPartitionProvider::new(params).unwrap();
//!
//! let bag = provider.generate_new_bag(&data);
//! assert_eq!(bag.bag.len() + bag.out_of_bag.len(), 100);
//! ```

pub mod aggregate;
pub mod components;
pub mod cv;
pub mod data;
pub mod logger;
pub mod metrics;
pub mod partition;
pub mod repr;
pub mod sampling;
pub mod testing;

pub use aggregate::{AggregateError, MergedView, ResultAggregator};
pub use cv::{CrossValidationConfig, CrossValidationOutput, CvError, FoldOrchestrator, FoldResult};
pub use data::{Dataset, DatasetError};
pub use logger::Verbosity;
pub use metrics::{MetricsSummary, MetricsTable};
pub use partition::{DatasetPartitioner, Partition, Stratification};
pub use sampling::{BaggingParams, BaggingPartitionProvider};
