//! Bag / out-of-bag row partitioning for ensemble training.
//!
//! One RNG stream drives every draw. Each call to
//! [`BaggingPartitionProvider::generate_new_bag`] consumes further draws from
//! that stream, so the sequence of bags is fully determined by the seed and
//! the number of calls.
//!
//! # Variants
//!
//! - [`BagMode::Rows`]: one uniform draw per row, in row order.
//! - [`BagMode::Groups`]: one uniform draw per group; the whole group follows
//!   it, so a query never straddles bag and out-of-bag.
//!
//! The draw step itself is exposed as the pure functions [`next_row_bag`] and
//! [`next_group_bag`], which take the RNG state by value and hand back the
//! advanced state together with the bag.

use bon::Builder;
use rand::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::Dataset;
use crate::partition::Partition;
use crate::repr::Forest;

/// RNG used for bagging.
pub type BagRng = Xoshiro256PlusPlus;

// ============================================================================
// Parameters
// ============================================================================

/// Whether bags are drawn per row or per group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BagMode {
    #[default]
    Rows,
    Groups,
}

/// Bagging parameters, validated by [`BaggingPartitionProvider::new`].
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug))]
pub struct BaggingParams {
    /// Probability that a row (or group) lands in the bag, in (0, 1).
    #[builder(default = 0.7)]
    pub train_fraction: f64,
    /// Number of consecutive trees trained on the same bag.
    #[builder(default = 1)]
    pub bag_size: usize,
    /// Leaf capacity hint used to pre-size the output partitions.
    #[builder(default = 20)]
    pub max_leaves: usize,
    #[builder(default)]
    pub mode: BagMode,
    #[builder(default = 42)]
    pub seed: u64,
}

impl Default for BaggingParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Bagging misconfiguration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BaggingError {
    #[error("bag size must be positive")]
    NonPositiveBagSize,

    #[error("max leaves must be positive")]
    NonPositiveLeafCount,

    #[error("train fraction must be in (0, 1), got {0}")]
    FractionOutOfRange(f64),
}

impl BaggingParams {
    fn validate(&self) -> Result<(), BaggingError> {
        if self.bag_size == 0 {
            return Err(BaggingError::NonPositiveBagSize);
        }
        if self.max_leaves == 0 {
            return Err(BaggingError::NonPositiveLeafCount);
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(BaggingError::FractionOutOfRange(self.train_fraction));
        }
        Ok(())
    }
}

// ============================================================================
// Bag
// ============================================================================

/// Group indices on each side of a group-level bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSplit {
    pub bag: Vec<u32>,
    pub out_of_bag: Vec<u32>,
}

/// One bag / out-of-bag split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bag {
    pub bag: Partition,
    pub out_of_bag: Partition,
    /// Present for group-level bags.
    pub groups: Option<GroupSplit>,
}

/// Draw a row-level bag.
pub fn next_row_bag(
    mut rng: BagRng,
    n_rows: usize,
    train_fraction: f64,
    max_leaves: usize,
) -> (BagRng, Bag) {
    let mut bag = Vec::with_capacity((n_rows as f64 * train_fraction) as usize + 1);
    let mut out_of_bag = Vec::new();
    for row in 0..n_rows as u32 {
        if rng.gen::<f64>() < train_fraction {
            bag.push(row);
        } else {
            out_of_bag.push(row);
        }
    }
    let split = Bag {
        bag: Partition::new(bag, max_leaves),
        out_of_bag: Partition::new(out_of_bag, max_leaves),
        groups: None,
    };
    (rng, split)
}

/// Draw a group-level bag over the groups of `data`.
pub fn next_group_bag(
    mut rng: BagRng,
    data: &Dataset,
    train_fraction: f64,
    max_leaves: usize,
) -> (BagRng, Bag) {
    let mut rows = (Vec::new(), Vec::new());
    let mut groups = GroupSplit {
        bag: Vec::new(),
        out_of_bag: Vec::new(),
    };
    for g in 0..data.n_groups() {
        let range = data.group_range(g);
        let range = range.start as u32..range.end as u32;
        if rng.gen::<f64>() < train_fraction {
            rows.0.extend(range);
            groups.bag.push(g as u32);
        } else {
            rows.1.extend(range);
            groups.out_of_bag.push(g as u32);
        }
    }
    let split = Bag {
        bag: Partition::new(rows.0, max_leaves),
        out_of_bag: Partition::new(rows.1, max_leaves),
        groups: Some(groups),
    };
    (rng, split)
}

// ============================================================================
// Provider
// ============================================================================

/// Produces successive bags from one seeded RNG stream.
#[derive(Debug, Clone)]
pub struct BaggingPartitionProvider {
    params: BaggingParams,
    rng: BagRng,
    bags_drawn: usize,
}

impl BaggingPartitionProvider {
    /// Validate `params` and seed the RNG stream.
    pub fn new(params: BaggingParams) -> Result<Self, BaggingError> {
        params.validate()?;
        let rng = BagRng::seed_from_u64(params.seed);
        Ok(Self {
            params,
            rng,
            bags_drawn: 0,
        })
    }

    #[inline]
    pub fn params(&self) -> &BaggingParams {
        &self.params
    }

    /// Number of bags drawn so far.
    #[inline]
    pub fn bags_drawn(&self) -> usize {
        self.bags_drawn
    }

    /// Current RNG state.
    #[inline]
    pub fn rng_state(&self) -> &BagRng {
        &self.rng
    }

    /// Draw the next bag, advancing the RNG stream.
    pub fn generate_new_bag(&mut self, data: &Dataset) -> Bag {
        let BaggingParams {
            train_fraction,
            max_leaves,
            mode,
            ..
        } = self.params;
        let rng = self.rng.clone();
        let (rng, bag) = match mode {
            BagMode::Rows => next_row_bag(rng, data.n_rows(), train_fraction, max_leaves),
            BagMode::Groups => next_group_bag(rng, data, train_fraction, max_leaves),
        };
        self.rng = rng;
        self.bags_drawn += 1;
        tracing::debug!(
            bag = self.bags_drawn - 1,
            in_bag = bag.bag.len(),
            out_of_bag = bag.out_of_bag.len(),
            "drew bag"
        );
        bag
    }
}

/// Divide every leaf output of `ensemble` by `num_trees / bag_size`.
///
/// The division is integral and clamped to at least one bag. Applying this
/// twice scales twice; callers apply it once per trained ensemble.
///
/// # Panics
///
/// Panics if `bag_size` is zero.
pub fn scale_ensemble_leaves(num_trees: usize, bag_size: usize, ensemble: &mut Forest) -> f64 {
    assert!(bag_size > 0, "bag_size must be positive");
    let bag_count = (num_trees / bag_size).max(1) as f64;
    ensemble.scale_leaves(1.0 / bag_count);
    bag_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::Tree;
    use approx::assert_relative_eq;

    fn provider(mode: BagMode, seed: u64) -> BaggingPartitionProvider {
        BaggingPartitionProvider::new(
            BaggingParams::builder()
                .train_fraction(0.5)
                .mode(mode)
                .seed(seed)
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_params() {
        let bad = |p: BaggingParams| BaggingPartitionProvider::new(p).unwrap_err();
        assert_eq!(
            bad(BaggingParams::builder().bag_size(0).build()),
            BaggingError::NonPositiveBagSize
        );
        assert_eq!(
            bad(BaggingParams::builder().max_leaves(0).build()),
            BaggingError::NonPositiveLeafCount
        );
        assert_eq!(
            bad(BaggingParams::builder().train_fraction(1.0).build()),
            BaggingError::FractionOutOfRange(1.0)
        );
    }

    #[test]
    fn test_row_bag_covers_rows() {
        let data = Dataset::empty(200);
        let bag = provider(BagMode::Rows, 1).generate_new_bag(&data);
        assert_eq!(bag.bag.len() + bag.out_of_bag.len(), 200);
        assert!(bag.bag.indices().windows(2).all(|w| w[0] < w[1]));
        assert!(bag.groups.is_none());
        assert_eq!(bag.bag.max_leaves(), 20);
    }

    #[test]
    fn test_pure_step_matches_provider() {
        let data = Dataset::empty(64);
        let mut p = provider(BagMode::Rows, 9);
        let start = p.rng_state().clone();
        let from_provider = p.generate_new_bag(&data);
        let (next, from_fn) = next_row_bag(start, 64, 0.5, 20);
        assert_eq!(from_provider, from_fn);
        assert_eq!(&next, p.rng_state());
    }

    #[test]
    fn test_successive_bags_differ() {
        let data = Dataset::empty(100);
        let mut p = provider(BagMode::Rows, 3);
        let a = p.generate_new_bag(&data);
        let b = p.generate_new_bag(&data);
        assert_ne!(a.bag, b.bag);
        assert_eq!(p.bags_drawn(), 2);
    }

    #[test]
    fn test_group_bag_keeps_groups_whole() {
        let data = Dataset::empty(10).with_groups(vec![0, 4, 5, 10]).unwrap();
        let bag = provider(BagMode::Groups, 5).generate_new_bag(&data);
        let groups = bag.groups.as_ref().unwrap();
        assert_eq!(groups.bag.len() + groups.out_of_bag.len(), 3);
        for &g in &groups.bag {
            for row in data.group_range(g as usize) {
                assert!(bag.bag.contains(row as u32));
            }
        }
    }

    #[test]
    fn test_scale_ensemble_leaves() {
        let mut forest = Forest::new();
        forest.push_tree(Tree::leaf(8.0));
        let count = scale_ensemble_leaves(8, 2, &mut forest);
        assert_relative_eq!(count, 4.0);
        assert_relative_eq!(forest.predict_row(&[]), 2.0);
    }

    #[test]
    fn test_scale_fewer_trees_than_bag_size() {
        let mut forest = Forest::new();
        forest.push_tree(Tree::leaf(8.0));
        scale_ensemble_leaves(1, 4, &mut forest);
        assert_relative_eq!(forest.predict_row(&[]), 8.0);
    }
}
