//! Name-keyed component lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{ColumnScorer, ComponentError, DataAdapter, Evaluator, Scorer, TrainerFactory};

/// Names of the components used for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNames {
    pub trainer: String,
    pub adapter: String,
    pub scorer: String,
    pub evaluator: String,
}

impl ComponentNames {
    /// Names with the default scorer.
    pub fn new(
        trainer: impl Into<String>,
        adapter: impl Into<String>,
        evaluator: impl Into<String>,
    ) -> Self {
        Self {
            trainer: trainer.into(),
            adapter: adapter.into(),
            scorer: ComponentRegistry::DEFAULT_SCORER.to_string(),
            evaluator: evaluator.into(),
        }
    }

    pub fn with_scorer(mut self, scorer: impl Into<String>) -> Self {
        self.scorer = scorer.into();
        self
    }
}

/// Resolved components shared by every fold of a run.
#[derive(Clone)]
pub struct FoldComponents {
    pub trainer: TrainerFactory,
    pub adapter: Arc<dyn DataAdapter>,
    pub scorer: Arc<dyn Scorer>,
    pub evaluator: Arc<dyn Evaluator>,
}

impl fmt::Debug for FoldComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FoldComponents")
            .field("scorer", &self.scorer.name())
            .field("evaluator", &self.evaluator.name())
            .finish_non_exhaustive()
    }
}

/// Registry of trainers, adapters, scorers and evaluators by name.
///
/// A new registry already holds the column scorer under `"default"`.
#[derive(Clone)]
pub struct ComponentRegistry {
    trainers: BTreeMap<String, TrainerFactory>,
    adapters: BTreeMap<String, Arc<dyn DataAdapter>>,
    scorers: BTreeMap<String, Arc<dyn Scorer>>,
    evaluators: BTreeMap<String, Arc<dyn Evaluator>>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    pub const DEFAULT_SCORER: &'static str = "default";

    pub fn new() -> Self {
        let mut scorers: BTreeMap<String, Arc<dyn Scorer>> = BTreeMap::new();
        scorers.insert(Self::DEFAULT_SCORER.to_string(), Arc::new(ColumnScorer));
        Self {
            trainers: BTreeMap::new(),
            adapters: BTreeMap::new(),
            scorers,
            evaluators: BTreeMap::new(),
        }
    }

    pub fn register_trainer(&mut self, name: impl Into<String>, factory: TrainerFactory) -> &mut Self {
        self.trainers.insert(name.into(), factory);
        self
    }

    pub fn register_adapter(
        &mut self,
        name: impl Into<String>,
        adapter: Arc<dyn DataAdapter>,
    ) -> &mut Self {
        self.adapters.insert(name.into(), adapter);
        self
    }

    pub fn register_scorer(&mut self, name: impl Into<String>, scorer: Arc<dyn Scorer>) -> &mut Self {
        self.scorers.insert(name.into(), scorer);
        self
    }

    pub fn register_evaluator(
        &mut self,
        name: impl Into<String>,
        evaluator: Arc<dyn Evaluator>,
    ) -> &mut Self {
        self.evaluators.insert(name.into(), evaluator);
        self
    }

    /// Registered trainer names, sorted.
    pub fn trainer_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.trainers.keys().map(String::as_str)
    }

    /// Look up every component named in `names`.
    pub fn resolve(&self, names: &ComponentNames) -> Result<FoldComponents, ComponentError> {
        Ok(FoldComponents {
            trainer: lookup(&self.trainers, "trainer", &names.trainer)?,
            adapter: lookup(&self.adapters, "adapter", &names.adapter)?,
            scorer: lookup(&self.scorers, "scorer", &names.scorer)?,
            evaluator: lookup(&self.evaluators, "evaluator", &names.evaluator)?,
        })
    }
}

fn lookup<T: Clone>(
    map: &BTreeMap<String, T>,
    kind: &'static str,
    name: &str,
) -> Result<T, ComponentError> {
    map.get(name).cloned().ok_or_else(|| ComponentError::Unknown {
        kind,
        name: name.to_string(),
    })
}
