//! Additive tree ensemble.

use serde::{Deserialize, Serialize};

use super::Tree;

/// Forest of regression trees whose outputs are summed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<Tree>,
    base_score: f64,
}

impl Forest {
    /// Empty forest with a zero base score.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base score added to every prediction.
    pub fn with_base_score(mut self, base_score: f64) -> Self {
        self.base_score = base_score;
        self
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    /// Iterate over trees.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Predict for a single row of features.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(features)).sum::<f64>()
    }

    /// Multiply the leaf values of every tree by `factor`.
    ///
    /// The base score is left untouched.
    pub fn scale_leaves(&mut self, factor: f64) {
        for tree in &mut self.trees {
            tree.scale_leaves(factor);
        }
    }
}
