//! Bagged forest construction.

use crate::data::Dataset;
use crate::repr::{Forest, Tree};

use super::bagging::{scale_ensemble_leaves, Bag, BaggingPartitionProvider};

/// Grows a forest where every `bag_size` consecutive trees share one bag.
///
/// Leaf outputs are averaged over bags exactly once, when the builder is
/// consumed by [`finish`](BaggedForestBuilder::finish).
///
/// ```ignore
/// let mut builder = BaggedForestBuilder::new(provider, &data);
/// for _ in 0..num_trees {
///     builder.grow_tree(|bag, data| fit_tree(data, bag.bag.indices()))?;
/// }
/// let forest = builder.finish();
/// ```
#[derive(Debug)]
pub struct BaggedForestBuilder<'a> {
    provider: BaggingPartitionProvider,
    data: &'a Dataset,
    forest: Forest,
    current: Option<Bag>,
    /// Trees already fitted on `current`.
    trees_on_bag: usize,
}

impl<'a> BaggedForestBuilder<'a> {
    pub fn new(provider: BaggingPartitionProvider, data: &'a Dataset) -> Self {
        Self {
            provider,
            data,
            forest: Forest::new(),
            current: None,
            trees_on_bag: 0,
        }
    }

    /// Start from a forest with a base score.
    pub fn with_base_score(mut self, base_score: f64) -> Self {
        self.forest = self.forest.with_base_score(base_score);
        self
    }

    /// Number of trees grown so far.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    /// Bag that the next tree would be trained on, if already drawn.
    pub fn current_bag(&self) -> Option<&Bag> {
        self.current.as_ref()
    }

    /// Fit one tree on the current bag and add it to the forest.
    ///
    /// A fresh bag is drawn before the first tree and after every
    /// `bag_size` trees.
    pub fn grow_tree<E>(
        &mut self,
        fit: impl FnOnce(&Bag, &Dataset) -> Result<Tree, E>,
    ) -> Result<(), E> {
        let bag_size = self.provider.params().bag_size;
        if self.trees_on_bag == bag_size {
            self.current = None;
            self.trees_on_bag = 0;
        }
        let data = self.data;
        let provider = &mut self.provider;
        let bag = self
            .current
            .get_or_insert_with(|| provider.generate_new_bag(data));
        let tree = fit(bag, data)?;
        self.forest.push_tree(tree);
        self.trees_on_bag += 1;
        Ok(())
    }

    /// Scale leaves by the number of bags and return the forest.
    pub fn finish(self) -> Forest {
        let mut forest = self.forest;
        let bag_size = self.provider.params().bag_size;
        scale_ensemble_leaves(forest.n_trees(), bag_size, &mut forest);
        forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::BaggingParams;
    use std::convert::Infallible;

    #[test]
    fn new_bag_every_bag_size_trees() {
        let data = Dataset::empty(30);
        let params = BaggingParams::builder().bag_size(2).seed(11).build();
        let provider = BaggingPartitionProvider::new(params).unwrap();
        let mut builder = BaggedForestBuilder::new(provider, &data);

        let mut seen = Vec::new();
        for _ in 0..4 {
            builder
                .grow_tree(|bag, _| {
                    seen.push(bag.bag.indices().to_vec());
                    Ok::<_, Infallible>(Tree::leaf(1.0))
                })
                .unwrap();
        }
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[2], seen[3]);
        assert_ne!(seen[0], seen[2]);
        assert_eq!(builder.provider.bags_drawn(), 2);
    }

    #[test]
    fn fit_error_propagates() {
        let data = Dataset::empty(5);
        let provider = BaggingPartitionProvider::new(BaggingParams::default()).unwrap();
        let mut builder = BaggedForestBuilder::new(provider, &data);
        let res = builder.grow_tree(|_, _| Err("boom"));
        assert_eq!(res, Err("boom"));
        assert_eq!(builder.n_trees(), 0);
    }
}
