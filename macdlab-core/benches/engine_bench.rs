//! Criterion benchmarks for MacdLab hot paths.
//!
//! Benchmarks:
//! 1. MACD frame computation
//! 2. Single simulation over a precomputed frame
//! 3. Sequential mini-grid of full backtests

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use macdlab_core::domain::{ParameterSet, PriceSeries};
use macdlab_core::engine::{backtest, simulate, SimulationConfig};
use macdlab_core::indicators::compute_macd;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> PriceSeries {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0 + i as f64 * 0.01)
        .collect();
    PriceSeries::from_closes(base_date, &closes)
}

// ── 1. Indicator ─────────────────────────────────────────────────────

fn bench_macd(c: &mut Criterion) {
    let mut group = c.benchmark_group("macd_compute");
    let params = ParameterSet::default();

    for &bar_count in &[252, 1260, 2520] {
        let series = make_series(bar_count);
        group.bench_with_input(
            BenchmarkId::new("macd_12_26_9", bar_count),
            &bar_count,
            |b, _| b.iter(|| compute_macd(black_box(&series), black_box(params))),
        );
    }
    group.finish();
}

// ── 2. Simulation ────────────────────────────────────────────────────

fn bench_simulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate");
    let cfg = SimulationConfig::default();

    for &bar_count in &[252, 1260, 2520] {
        let series = make_series(bar_count);
        let Ok(frame) = compute_macd(&series, ParameterSet::default()) else {
            continue;
        };
        group.bench_with_input(
            BenchmarkId::new("single_run", bar_count),
            &bar_count,
            |b, _| b.iter(|| simulate(black_box(&series), black_box(&frame), black_box(&cfg))),
        );
    }
    group.finish();
}

// ── 3. Mini-grid ─────────────────────────────────────────────────────

fn bench_mini_grid(c: &mut Criterion) {
    let series = make_series(1260);
    let cfg = SimulationConfig::default();
    let grid: Vec<ParameterSet> = (5..=15)
        .step_by(5)
        .flat_map(|fast| {
            (20..=40)
                .step_by(10)
                .flat_map(move |slow| (5..=9).step_by(2).map(move |sig| ParameterSet::new(fast, slow, sig)))
        })
        .collect();

    c.bench_function("mini_grid_27_runs", |b| {
        b.iter(|| {
            grid.iter()
                .filter_map(|&p| backtest(black_box(&series), p, &cfg).ok())
                .map(|r| r.final_equity)
                .sum::<f64>()
        })
    });
}

criterion_group!(benches, bench_macd, bench_simulate, bench_mini_grid);
criterion_main!(benches);
