//! Bagging partition properties.

mod common;

use std::convert::Infallible;

use common::*;
use foldwise::data::{Column, Dataset};
use foldwise::repr::{Forest, MutableTree, Tree};
use foldwise::sampling::{
    next_row_bag, scale_ensemble_leaves, BagMode, BagRng, BaggedForestBuilder, BaggingError,
    BaggingParams, BaggingPartitionProvider,
};
use proptest::prelude::*;
use rand::SeedableRng;

fn provider(mode: BagMode, fraction: f64, seed: u64) -> BaggingPartitionProvider {
    let params = BaggingParams::builder()
        .train_fraction(fraction)
        .mode(mode)
        .seed(seed)
        .build();
    BaggingPartitionProvider::new(params).unwrap()
}

fn grouped(sizes: &[usize]) -> Dataset {
    let n: usize = sizes.iter().sum();
    let mut offsets = vec![0];
    for s in sizes {
        offsets.push(offsets.last().unwrap() + s);
    }
    Dataset::new(vec![Column::numeric("x", vec![0.0; n])])
        .unwrap()
        .with_groups(offsets)
        .unwrap()
}

/// Sorted concatenation of both sides equals `0..n`.
fn assert_covers(bag: &[u32], oob: &[u32], n: usize) {
    assert!(bag.windows(2).all(|w| w[0] < w[1]), "bag not ascending");
    assert!(oob.windows(2).all(|w| w[0] < w[1]), "oob not ascending");
    let mut all: Vec<u32> = bag.iter().chain(oob).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..n as u32).collect::<Vec<_>>());
}

proptest! {
    #[test]
    fn row_bags_partition_all_rows(n in 0usize..500, fraction in 0.01f64..0.99, seed in any::<u64>()) {
        let data = Dataset::empty(n);
        let bag = provider(BagMode::Rows, fraction, seed).generate_new_bag(&data);
        assert_covers(bag.bag.indices(), bag.out_of_bag.indices(), n);
        prop_assert!(bag.groups.is_none());
    }

    #[test]
    fn group_bags_keep_groups_whole(
        sizes in prop::collection::vec(1usize..6, 1..60),
        seed in any::<u64>(),
    ) {
        let data = grouped(&sizes);
        let bag = provider(BagMode::Groups, 0.5, seed).generate_new_bag(&data);
        assert_covers(bag.bag.indices(), bag.out_of_bag.indices(), data.n_rows());

        let groups = bag.groups.unwrap();
        prop_assert_eq!(groups.bag.len() + groups.out_of_bag.len(), sizes.len());
        for &g in &groups.bag {
            for row in data.group_range(g as usize) {
                prop_assert!(bag.bag.contains(row as u32));
            }
        }
        for &g in &groups.out_of_bag {
            for row in data.group_range(g as usize) {
                prop_assert!(bag.out_of_bag.contains(row as u32));
            }
        }
    }
}

#[test]
fn same_seed_same_bags() {
    let data = Dataset::empty(200);
    let mut a = provider(BagMode::Rows, 0.7, 9);
    let mut b = provider(BagMode::Rows, 0.7, 9);
    for _ in 0..5 {
        assert_eq!(a.generate_new_bag(&data), b.generate_new_bag(&data));
    }
    assert_eq!(a.bags_drawn(), 5);
}

#[test]
fn provider_matches_pure_draw() {
    let data = Dataset::empty(64);
    let mut p = provider(BagMode::Rows, 0.3, 1234);
    let first = p.generate_new_bag(&data);

    let (rng, pure) = next_row_bag(BagRng::seed_from_u64(1234), 64, 0.3, 20);
    assert_eq!(first, pure);
    assert_eq!(p.rng_state(), &rng);
}

#[test]
fn misconfiguration_fails_at_construction() {
    let bad = BaggingParams::builder().bag_size(0).build();
    assert_eq!(
        BaggingPartitionProvider::new(bad).unwrap_err(),
        BaggingError::NonPositiveBagSize
    );
    let bad = BaggingParams::builder().max_leaves(0).build();
    assert_eq!(
        BaggingPartitionProvider::new(bad).unwrap_err(),
        BaggingError::NonPositiveLeafCount
    );
}

#[test]
fn leaf_scaling_is_cumulative() {
    let mut forest = Forest::new();
    forest.push_tree(Tree::leaf(8.0));

    // 8 trees in bags of 2: four bags.
    assert_eq!(scale_ensemble_leaves(8, 2, &mut forest), 4.0);
    assert_approx_eq!(forest.predict_row(&[]), 2.0);

    scale_ensemble_leaves(8, 2, &mut forest);
    assert_approx_eq!(forest.predict_row(&[]), 0.5);
}

#[test]
fn bagged_builder_scales_exactly_once() {
    let data = Dataset::new(vec![Column::numeric("x", (0..40).map(f64::from).collect())]).unwrap();
    let params = BaggingParams::builder().bag_size(2).seed(3).build();
    let mut builder = BaggedForestBuilder::new(BaggingPartitionProvider::new(params).unwrap(), &data);

    for _ in 0..8 {
        builder
            .grow_tree(|bag, _| {
                assert!(!bag.bag.is_empty());
                let mut tree = MutableTree::new();
                let (left, right) = tree.split(0, 0, 20.0);
                tree.set_leaf(left, 8.0);
                tree.set_leaf(right, 16.0);
                Ok::<_, Infallible>(tree.freeze())
            })
            .unwrap();
    }
    let forest = builder.finish();

    assert_eq!(forest.n_trees(), 8);
    // Eight trees summed, divided by four bags.
    assert_approx_eq!(forest.predict_row(&[5.0]), 16.0);
    assert_approx_eq!(forest.predict_row(&[30.0]), 32.0);
}
