//! Benchmark comparing the pairwise and matrix correlation paths, plus a full
//! cleaning pass over a wide team-statistics table
//!
//! Run with: cargo bench --bench correlation_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use squadfeat::pipeline::{clean, correlation_matrix, select_redundant, CleaningConfig};

/// Synthetic per-squad metrics; every fourth column is a noisy copy of an
/// earlier one so the pruner has something to drop.
fn generate_metrics(n_rows: usize, n_features: usize, with_null: bool, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(n_features);

    for i in 0..n_features {
        let values: Vec<Option<f64>> = if i % 4 == 3 {
            columns[i - 3]
                .iter()
                .map(|v| v.map(|x| x + rng.gen::<f64>() * 0.01))
                .collect()
        } else {
            (0..n_rows).map(|_| Some(rng.gen::<f64>() * 100.0)).collect()
        };
        columns.push(values);
    }

    if with_null {
        if let Some(first) = columns.first_mut().and_then(|c| c.first_mut()) {
            *first = None;
        }
    }

    let squads: Vec<String> = (0..n_rows).map(|i| format!("Squad {}", i % 20)).collect();
    let mut all = vec![Column::new("Squad".into(), squads)];
    all.extend(
        columns
            .into_iter()
            .enumerate()
            .map(|(i, v)| Column::new(format!("metric_{}", i).into(), v)),
    );

    DataFrame::new(all).expect("Failed to create DataFrame")
}

/// Pairwise (forced by a null) vs matrix correlation for varying column counts
fn benchmark_correlation_by_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_by_columns");
    group.sample_size(20);

    let n_rows = 2_000;
    for n_cols in [16, 50, 100, 200] {
        let dense = generate_metrics(n_rows, n_cols, false, 42);
        let sparse = generate_metrics(n_rows, n_cols, true, 42);

        group.throughput(Throughput::Elements(((n_cols * (n_cols - 1)) / 2) as u64));

        group.bench_with_input(BenchmarkId::new("pairwise", n_cols), &sparse, |b, df| {
            b.iter(|| correlation_matrix(black_box(df)))
        });
        group.bench_with_input(BenchmarkId::new("matrix", n_cols), &dense, |b, df| {
            b.iter(|| correlation_matrix(black_box(df)))
        });
    }

    group.finish();
}

/// Greedy redundancy selection end to end
fn benchmark_select_redundant(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_redundant");
    group.sample_size(20);

    for n_rows in [500, 2_000, 10_000] {
        let df = generate_metrics(n_rows, 100, false, 7);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &df, |b, df| {
            b.iter(|| select_redundant(black_box(df), black_box(0.9999)))
        });
    }

    group.finish();
}

/// The whole feature selection pipeline on a merged-size table
fn benchmark_clean(c: &mut Criterion) {
    let df = generate_metrics(1_500, 300, true, 11);
    let config = CleaningConfig::default().with_drop_exact(["Squad"]);

    c.bench_function("clean_300_metrics", |b| {
        b.iter(|| clean(black_box(&df), black_box(&config)))
    });
}

criterion_group!(
    benches,
    benchmark_correlation_by_columns,
    benchmark_select_redundant,
    benchmark_clean
);
criterion_main!(benches);
