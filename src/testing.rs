//! Testing utilities for foldwise.
//!
//! Assertion helpers and small reference components usable from unit and
//! integration tests:
//!
//! ```ignore
//! use foldwise::testing::{regression_dataset, MeanTrainer, SquaredErrorEvaluator};
//! ```

use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::components::{
    ComponentError, Evaluator, Predictor, ScoredData, TrainContext, Trainer, TrainerFactory,
};
use crate::data::{Column, ColumnDescriptor, ColumnKind, Dataset, RoleMappedData, Width};
use crate::metrics::MetricsTable;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two f64 values are approximately equal.
///
/// # Examples
///
/// ```
/// # use foldwise::assert_approx_eq;
/// assert_approx_eq!(1.0, 1.0001, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, $crate::testing::DEFAULT_TOLERANCE)
    };
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
}

/// Assert that two metric tables hold the same metrics in the same order.
pub fn assert_metrics_eq(left: &MetricsTable, right: &MetricsTable, tolerance: f64) {
    let l: Vec<_> = left.iter().collect();
    let r: Vec<_> = right.iter().collect();
    assert_eq!(l.len(), r.len(), "metric count differs: {left} vs {right}");
    for ((ln, lv), (rn, rv)) in l.into_iter().zip(r) {
        assert_eq!(ln, rn, "metric order differs");
        assert_approx_eq!(lv, rv, tolerance);
    }
}

// =============================================================================
// Datasets
// =============================================================================

/// `n_rows` rows with `Label = i`, `Features = i / n`, `Split = (i + 0.5) / n`
/// and `Name = "row{i}"`.
pub fn regression_dataset(n_rows: usize) -> Dataset {
    let n = n_rows.max(1) as f64;
    let columns = vec![
        Column::text("Name", (0..n_rows).map(|i| format!("row{i}")).collect()),
        Column::numeric("Label", (0..n_rows).map(|i| i as f64).collect()),
        Column::numeric("Features", (0..n_rows).map(|i| i as f64 / n).collect()),
        Column::numeric("Split", (0..n_rows).map(|i| (i as f64 + 0.5) / n).collect()),
    ];
    Dataset::new(columns).expect("columns share one length")
}

// =============================================================================
// Reference components
// =============================================================================

/// Predicts the (weighted) training label mean for every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanPredictor {
    pub mean: f64,
    /// Rows of validation data seen during training.
    pub validation_rows: Option<usize>,
    /// Mean of the prior predictor training continued from.
    pub prior_mean: Option<f64>,
}

impl MeanPredictor {
    pub const OUTPUT: &'static str = "Score";

    pub fn new(mean: f64) -> Self {
        Self {
            mean,
            validation_rows: None,
            prior_mean: None,
        }
    }
}

impl Predictor for MeanPredictor {
    fn name(&self) -> &str {
        "mean"
    }

    fn output_columns(&self) -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor {
            name: Self::OUTPUT.to_string(),
            kind: ColumnKind::Numeric,
            width: Width::Scalar,
            key_cardinality: None,
            slot_names: None,
            hidden: false,
        }]
    }

    fn predict(&self, data: &RoleMappedData) -> Result<Vec<Column>, ComponentError> {
        Ok(vec![Column::numeric(Self::OUTPUT, vec![self.mean; data.n_rows()])])
    }

    fn save(&self, writer: &mut dyn Write) -> Result<(), ComponentError> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

/// Trains a [`MeanPredictor`].
#[derive(Debug, Clone, Default)]
pub struct MeanTrainer {
    validation: bool,
    continued: bool,
    normalization: bool,
}

impl MeanTrainer {
    /// Accept validation data.
    pub fn with_validation(mut self) -> Self {
        self.validation = true;
        self
    }

    /// Accept a prior predictor.
    pub fn with_continued_training(mut self) -> Self {
        self.continued = true;
        self
    }

    /// Ask for normalized features.
    pub fn with_normalization(mut self) -> Self {
        self.normalization = true;
        self
    }

    /// Factory producing default trainers.
    pub fn factory() -> TrainerFactory {
        Self::default().into_factory()
    }

    /// Factory producing clones of this trainer.
    pub fn into_factory(self) -> TrainerFactory {
        Arc::new(move || Box::new(self.clone()) as Box<dyn Trainer>)
    }
}

impl Trainer for MeanTrainer {
    fn name(&self) -> &str {
        "mean"
    }

    fn supports_validation(&self) -> bool {
        self.validation
    }

    fn supports_continued_training(&self) -> bool {
        self.continued
    }

    fn needs_normalization(&self) -> bool {
        self.normalization
    }

    fn train(&mut self, ctx: TrainContext<'_>) -> Result<Arc<dyn Predictor>, ComponentError> {
        let label = ctx
            .train
            .label()?
            .ok_or_else(|| ComponentError::failed("mean", "no label column"))?;
        if label.is_empty() {
            return Err(ComponentError::failed("mean", "empty training set"));
        }
        let (sum, total) = match ctx.train.weights()? {
            Some(w) => label
                .iter()
                .zip(w)
                .fold((0.0, 0.0), |(s, t), (y, w)| (s + y * w, t + w)),
            None => (label.iter().sum::<f64>(), label.len() as f64),
        };

        let mut predictor = MeanPredictor::new(sum / total);
        predictor.validation_rows = ctx.validation.map(RoleMappedData::n_rows);
        predictor.prior_mean = ctx.prior.and_then(|p| {
            let mut buf = Vec::new();
            p.save(&mut buf).ok()?;
            serde_json::from_slice::<MeanPredictor>(&buf).ok().map(|m| m.mean)
        });
        Ok(Arc::new(predictor))
    }
}

/// Fails whenever a label value from `sentinels` is missing from the
/// training rows, i.e. on folds that hold a sentinel row out for testing.
#[derive(Debug, Clone)]
pub struct FailingTrainer {
    sentinels: Vec<f64>,
}

impl FailingTrainer {
    pub fn new(sentinels: Vec<f64>) -> Self {
        Self { sentinels }
    }

    pub fn into_factory(self) -> TrainerFactory {
        Arc::new(move || Box::new(self.clone()) as Box<dyn Trainer>)
    }
}

impl Trainer for FailingTrainer {
    fn name(&self) -> &str {
        "failing"
    }

    fn train(&mut self, ctx: TrainContext<'_>) -> Result<Arc<dyn Predictor>, ComponentError> {
        let label = ctx.train.label()?.unwrap_or(&[]);
        if let Some(missing) = self.sentinels.iter().find(|s| !label.contains(s)) {
            return Err(ComponentError::failed(
                "failing",
                format!("sentinel {missing} held out"),
            ));
        }
        MeanTrainer::default().train(ctx)
    }
}

/// Mean squared and absolute error of the score column against the label.
///
/// Per-instance output holds the name column (if bound), label, score and
/// per-row squared error.
#[derive(Debug, Clone)]
pub struct SquaredErrorEvaluator {
    pub score_column: String,
}

impl Default for SquaredErrorEvaluator {
    fn default() -> Self {
        Self {
            score_column: MeanPredictor::OUTPUT.to_string(),
        }
    }
}

impl SquaredErrorEvaluator {
    fn residuals<'a>(
        &self,
        scored: &'a ScoredData,
    ) -> Result<(&'a [f64], &'a [f64]), ComponentError> {
        let label = scored
            .data
            .label()?
            .ok_or_else(|| ComponentError::failed("l2", "no label column"))?;
        let score = scored
            .data
            .data()
            .require(&self.score_column)?
            .as_numeric()
            .ok_or_else(|| ComponentError::failed("l2", "score column is not numeric"))?;
        Ok((label, score))
    }
}

impl Evaluator for SquaredErrorEvaluator {
    fn name(&self) -> &str {
        "l2"
    }

    fn evaluate(&self, scored: &ScoredData) -> Result<MetricsTable, ComponentError> {
        let (label, score) = self.residuals(scored)?;
        let n = label.len().max(1) as f64;
        let l2 = label.iter().zip(score).map(|(y, p)| (y - p).powi(2)).sum::<f64>() / n;
        let l1 = label.iter().zip(score).map(|(y, p)| (y - p).abs()).sum::<f64>() / n;
        Ok(MetricsTable::new().with("L2", l2).with("L1", l1))
    }

    fn per_instance(&self, scored: &ScoredData) -> Result<Option<Dataset>, ComponentError> {
        let (label, score) = self.residuals(scored)?;
        let mut columns = Vec::with_capacity(4);
        if let Some(name) = &scored.data.roles().name {
            columns.push(scored.data.data().require(name)?.clone());
        }
        columns.push(Column::numeric("Label", label.to_vec()));
        columns.push(Column::numeric("Score", score.to_vec()));
        columns.push(Column::numeric(
            "L2",
            label.iter().zip(score).map(|(y, p)| (y - p).powi(2)).collect(),
        ));
        Ok(Some(Dataset::new(columns)?))
    }
}

/// Per-instance output whose `Widths` vector column is as wide as the fold's
/// test set, so folds of different sizes disagree on its width.
#[derive(Debug, Clone, Default)]
pub struct RowWidthEvaluator;

impl Evaluator for RowWidthEvaluator {
    fn name(&self) -> &str {
        "row_width"
    }

    fn evaluate(&self, scored: &ScoredData) -> Result<MetricsTable, ComponentError> {
        Ok(MetricsTable::new().with("Rows", scored.data.n_rows() as f64))
    }

    fn per_instance(&self, scored: &ScoredData) -> Result<Option<Dataset>, ComponentError> {
        let n = scored.data.n_rows();
        if n == 0 {
            return Ok(None);
        }
        let widths = Column::numeric_vector("Widths", n, vec![1.0; n * n])?;
        Ok(Some(Dataset::new(vec![widths])?))
    }
}
