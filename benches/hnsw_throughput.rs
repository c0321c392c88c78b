//! Insert and search throughput for the graph-HNSW vector index backend.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::RngExt;
use recall_core::distance::Metric;
use recall_core::types::VectorIndexConfig;
use recall_core::vector_index::graph_hnsw::GraphHnsw;
use recall_core::vector_index::VectorIndex;

const DIMENSION: usize = 128;

fn random_unit_vector(dimension: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    let mut v: Vec<f32> = (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect();
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

fn populated_index(n: usize) -> GraphHnsw {
    let config = VectorIndexConfig::new(DIMENSION, Metric::Cosine);
    let mut index = GraphHnsw::new(config);
    for i in 0..n {
        index.insert(i.to_string(), random_unit_vector(DIMENSION)).unwrap();
    }
    index
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_insert");
    for &n in &[1_000usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || (populated_index(n), random_unit_vector(DIMENSION)),
                |(mut index, v)| {
                    index.insert(black_box("new".to_string()), black_box(v)).unwrap();
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_search");
    for &n in &[1_000usize, 10_000] {
        let index = populated_index(n);
        let query = random_unit_vector(DIMENSION);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                black_box(index.search(black_box(&query), 10).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search);
criterion_main!(benches);
