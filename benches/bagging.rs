//! Bagging and fold partitioning benchmarks.
//!
//! - Row vs group bag draws over growing datasets
//! - Stratified fold assignment and split materialization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use foldwise::data::{Column, Dataset};
use foldwise::partition::{DatasetPartitioner, Stratification};
use foldwise::sampling::{BagMode, BaggingParams, BaggingPartitionProvider};

// =============================================================================
// Data Generation
// =============================================================================

/// `n_rows` rows with a uniform `Split` column and groups of `group_size`.
fn bench_dataset(n_rows: usize, group_size: usize) -> Dataset {
    let split = (0..n_rows).map(|i| (i as f64 + 0.5) / n_rows as f64).collect();
    let mut offsets: Vec<usize> = (0..n_rows).step_by(group_size).collect();
    offsets.push(n_rows);
    Dataset::new(vec![Column::numeric("Split", split)])
        .and_then(|d| d.with_groups(offsets))
        .expect("valid benchmark dataset")
}

// =============================================================================
// Bagging
// =============================================================================

fn bench_generate_new_bag(c: &mut Criterion) {
    let mut group = c.benchmark_group("bagging/generate_new_bag");

    for n_rows in [10_000, 100_000, 1_000_000] {
        let data = bench_dataset(n_rows, 10);
        group.throughput(Throughput::Elements(n_rows as u64));

        for (name, mode) in [("rows", BagMode::Rows), ("groups", BagMode::Groups)] {
            let params = BaggingParams::builder().mode(mode).seed(42).build();
            let mut provider = BaggingPartitionProvider::new(params).expect("valid params");
            group.bench_with_input(BenchmarkId::new(name, n_rows), &data, |b, data| {
                b.iter(|| black_box(provider.generate_new_bag(black_box(data))))
            });
        }
    }

    group.finish();
}

// =============================================================================
// Fold partitioning
// =============================================================================

fn bench_fold_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition/fold_split");

    for n_rows in [10_000, 100_000, 1_000_000] {
        let data = bench_dataset(n_rows, 1);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::new("assign", n_rows), &data, |b, data| {
            let policy = Stratification::Column("Split".into());
            b.iter(|| black_box(DatasetPartitioner::new(data, &policy, 5).expect("valid")))
        });

        let partitioner = DatasetPartitioner::new(&data, &Stratification::Auto, 5).expect("valid");
        group.bench_with_input(BenchmarkId::new("split", n_rows), &partitioner, |b, p| {
            b.iter(|| black_box(p.split(black_box(2)).expect("valid fold")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate_new_bag, bench_fold_split);
criterion_main!(benches);
