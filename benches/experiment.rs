//! 实验引擎性能基准测试
//!
//! 分桶与选择在每次扫码的热路径上执行。

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use qrlinker::experiment::{bucket, determine_winner, evaluate, normal_cdf, select};
use qrlinker::storage::Variant;

fn variants(n: usize) -> Vec<Variant> {
    (0..n)
        .map(|i| {
            Variant::new(
                "exp-bench",
                &format!("v{:02}", i),
                &format!("https://v{}.example.com", i),
                (i as u32 % 100) + 1,
            )
        })
        .collect()
}

// ============== bucket 基准测试 ==============

fn bench_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("experiment/bucket");

    group.bench_function("short_visitor", |b| {
        b.iter(|| bucket(black_box("exp-bench"), black_box("visitor-1")));
    });

    let long_visitor = "f".repeat(128);
    group.bench_function("long_visitor", |b| {
        b.iter(|| bucket(black_box("exp-bench"), black_box(&long_visitor)));
    });

    group.finish();
}

// ============== select 基准测试 ==============

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("experiment/select");

    for n in [2usize, 5, 20] {
        let vs = variants(n);
        group.bench_with_input(BenchmarkId::new("fresh_visitor", n), &vs, |b, vs| {
            b.iter(|| {
                select(black_box("exp-bench"), black_box("visitor-1"), vs, None)
                    .map(|s| s.variant.id.len())
            });
        });
    }

    group.finish();
}

// ============== significance 基准测试 ==============

fn bench_significance(c: &mut Criterion) {
    let mut group = c.benchmark_group("experiment/significance");

    group.bench_function("normal_cdf", |b| {
        b.iter(|| normal_cdf(black_box(1.96)));
    });

    group.bench_function("evaluate_significant", |b| {
        b.iter(|| evaluate(black_box(100), black_box(220), black_box(0.95)));
    });

    group.bench_function("evaluate_insufficient", |b| {
        b.iter(|| evaluate(black_box(10), black_box(12), black_box(0.95)));
    });

    let mut vs = variants(5);
    for (i, v) in vs.iter_mut().enumerate() {
        v.scan_count = 100 + (i as u64) * 40;
    }
    group.bench_function("determine_winner_5", |b| {
        b.iter(|| determine_winner(black_box(&vs), black_box(0.95)));
    });

    group.finish();
}

criterion_group!(benches, bench_bucket, bench_select, bench_significance);
criterion_main!(benches);
