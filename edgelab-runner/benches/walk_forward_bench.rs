//! Criterion benchmarks for the runner's backtest path.
//!
//! Run with: `cargo bench -p edgelab-runner`

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use edgelab_core::data::random_walk_bars;
use edgelab_core::features::{build_features, FeatureRow};
use edgelab_core::forecast::ModelConfig;
use edgelab_core::labeling::{label_bars, LabelConfig};
use edgelab_runner::metrics::BacktestSummary;
use edgelab_runner::{run_walk_forward, BacktestConfig};

fn feature_rows(n: usize) -> Vec<FeatureRow> {
    let bars = random_walk_bars(NaiveDate::from_ymd_opt(2015, 1, 2).unwrap(), n, 11);
    build_features(&label_bars(&bars, &LabelConfig::default()))
}

fn bench_walk_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_forward");
    group.sample_size(10);
    let model = ModelConfig {
        n_estimators: 50,
        ..ModelConfig::default()
    };
    let cfg = BacktestConfig::default();
    for n in [500usize, 1_500] {
        let rows = feature_rows(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, r| {
            b.iter(|| run_walk_forward(black_box(r), &model, &cfg))
        });
    }
    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let model = ModelConfig {
        n_estimators: 25,
        ..ModelConfig::default()
    };
    let rows = run_walk_forward(&feature_rows(1_500), &model, &BacktestConfig::default())
        .unwrap_or_default();
    c.bench_function("backtest_summary", |b| {
        b.iter(|| BacktestSummary::compute(black_box(&rows)))
    });
}

criterion_group!(benches, bench_walk_forward, bench_summary);
criterion_main!(benches);
