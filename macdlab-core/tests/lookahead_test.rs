//! Look-ahead contamination tests.
//!
//! Invariant: nothing computed for bar t may depend on bars t+1 or later.
//!
//! Method: run on a truncated series (bars 0..n) and on the full series and
//! assert everything up to bar n is identical. The indicator frame is
//! computed upfront over the whole series, so this is the check that the
//! precomputation does not leak future data into earlier decisions.

use chrono::NaiveDate;
use macdlab_core::domain::{ParameterSet, PriceSeries};
use macdlab_core::engine::{backtest, SimulationConfig, TradeTiming};
use macdlab_core::indicators::compute_macd;
use macdlab_core::signals::{signals_for_frame, CrossoverRule};

/// Deterministic pseudo-random walk.
fn make_test_series(n: usize) -> PriceSeries {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut price = 100.0;
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
            price = (price + change * 2.0).max(10.0);
            price
        })
        .collect();
    PriceSeries::from_closes(base_date, &closes)
}

fn same_or_both_nan(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

#[test]
fn indicator_values_do_not_depend_on_future_bars() {
    let full = make_test_series(300);
    let params = ParameterSet::new(12, 26, 9);
    let full_frame = compute_macd(&full, params).unwrap();

    for n in [40, 100, 211, 299] {
        let truncated = full.slice(0..n);
        let frame = compute_macd(&truncated, params).unwrap();
        assert_eq!(frame.len(), n);
        for i in 0..n {
            assert!(
                same_or_both_nan(frame.macd[i], full_frame.macd[i]),
                "macd differs at bar {i} (truncated at {n})"
            );
            assert!(
                same_or_both_nan(frame.signal[i], full_frame.signal[i]),
                "signal differs at bar {i} (truncated at {n})"
            );
        }
    }
}

#[test]
fn signals_do_not_depend_on_future_bars() {
    let full = make_test_series(300);
    let params = ParameterSet::new(5, 20, 5);
    for rule in [CrossoverRule::Corrected, CrossoverRule::Reference] {
        let full_signals = signals_for_frame(&compute_macd(&full, params).unwrap(), rule);
        for n in [30, 150, 250] {
            let part = signals_for_frame(&compute_macd(&full.slice(0..n), params).unwrap(), rule);
            assert_eq!(part[..], full_signals[..n], "truncated at {n}");
        }
    }
}

#[test]
fn closed_trades_do_not_depend_on_future_bars() {
    let full = make_test_series(300);
    let params = ParameterSet::new(5, 20, 5);
    for timing in [TradeTiming::OnClose, TradeTiming::OnNextOpen] {
        let cfg = SimulationConfig::default()
            .with_timing(timing)
            .with_force_close(false);
        let full_run = backtest(&full, params, &cfg).unwrap();

        let n = 180;
        let part_run = backtest(&full.slice(0..n), params, &cfg).unwrap();
        let full_closed: Vec<_> = full_run
            .trades
            .iter()
            .filter(|t| t.exit_bar < n - 1)
            .cloned()
            .collect();
        let part_closed: Vec<_> = part_run
            .trades
            .iter()
            .filter(|t| t.exit_bar < n - 1)
            .cloned()
            .collect();
        assert_eq!(part_closed, full_closed);
        assert_eq!(
            part_run.equity_curve[..n - 1],
            full_run.equity_curve[..n - 1]
        );
    }
}
