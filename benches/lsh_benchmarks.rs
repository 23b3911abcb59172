//! LSH benchmarks: signature computation, ensemble insert, and end-to-end routing.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use firststory::lsh::HashTable;
use firststory::{Config, LshIndex, SparseVector, StreamingClusterer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const VOCABULARY: u32 = 5_000;

/// Zipf-ish word sample: low IDs occur far more often than high ones.
fn word_sample(len: usize) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..len)
        .map(|_| {
            let u: f64 = rng.gen_range(0.0..1.0);
            (u * u * f64::from(VOCABULARY)) as u32
        })
        .collect()
}

fn posts(count: usize) -> Vec<SparseVector> {
    let mut rng = StdRng::seed_from_u64(2);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(4..16);
            SparseVector::new((0..len).map(|_| rng.gen_range(0..VOCABULARY / 10)))
        })
        .collect()
}

fn bench_signature(c: &mut Criterion) {
    let sample = word_sample(50_000);
    let post = &posts(1)[0];

    let mut group = c.benchmark_group("signature");
    for planes in [50usize, 200, 800] {
        let table = HashTable::new(planes, 70, &sample, 3).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(planes), &table, |b, table| {
            b.iter(|| black_box(table.signature(black_box(post))));
        });
    }
    group.finish();
}

fn bench_ensemble_insert(c: &mut Criterion) {
    let sample = word_sample(50_000);
    let stream = posts(2_000);

    let mut group = c.benchmark_group("ensemble_insert");
    group.sample_size(20);
    for tables in [5usize, 25] {
        group.bench_with_input(BenchmarkId::new("sequential", tables), &tables, |b, &tables| {
            b.iter(|| {
                let mut index = LshIndex::new(tables, 200, 70, &sample, 2015).unwrap();
                for (id, post) in stream.iter().enumerate() {
                    black_box(index.insert(id as u64, post).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_clusterer(c: &mut Criterion) {
    let sample = word_sample(50_000);
    let stream = posts(2_000);

    let mut group = c.benchmark_group("clusterer");
    group.sample_size(10);
    for parallel in [false, true] {
        let mut config = Config::default();
        config.performance.parallel_tables = parallel;
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut clusterer = StreamingClusterer::from_config(&config, &sample).unwrap();
                for (id, post) in stream.iter().enumerate() {
                    black_box(clusterer.process(id as u64, post).unwrap());
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_signature,
    bench_ensemble_insert,
    bench_clusterer
);
criterion_main!(benches);
