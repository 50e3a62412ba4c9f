//! Integration tests for crossover detection and the MACD strategy.

use chrono::NaiveDate;
use macdlab_core::domain::{ParameterSet, PriceSeries};
use macdlab_core::indicators::{compute_macd, IndicatorFrame};
use macdlab_core::signals::{
    crossovers, crossovers_with_level, signals_for_frame, Cross, CrossoverRule, Signal,
};

/// 21 bars falling 120 → 100, then 39 bars rising 101 → 139.
fn v_shape() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..=20).map(|i| 120.0 - i as f64).collect();
    closes.extend((1..=39).map(|i| 100.0 + i as f64));
    closes
}

fn frame_from(macd: &[f64], signal: &[f64]) -> IndicatorFrame {
    IndicatorFrame {
        params: ParameterSet::new(3, 6, 3),
        macd: macd.to_vec(),
        signal: signal.to_vec(),
        histogram: macd.iter().zip(signal).map(|(m, s)| m - s).collect(),
    }
}

#[test]
fn oscillation_yields_alternating_crosses() {
    let a = [-1.0, 1.0, -1.0, 1.0];
    let b = [0.0; 4];
    let got: Vec<Cross> = crossovers(&a, &b).collect();
    assert_eq!(got, vec![Cross::Up, Cross::Down, Cross::Up]);
}

#[test]
fn unbroken_equality_yields_none() {
    let a = [2.0; 6];
    assert!(crossovers(&a, &a).all(|c| c == Cross::None));
    assert!(crossovers_with_level(&[0.0; 6], 0.0).all(|c| c == Cross::None));
}

#[test]
fn touch_and_leave_is_not_a_cross() {
    // Rises to the level, rests on it, leaves upward: never strict.
    let a = [-1.0, 0.0, 0.0, 1.0];
    assert!(crossovers_with_level(&a, 0.0).all(|c| c == Cross::None));
}

#[test]
fn v_shape_emits_single_zero_line_buy() {
    let series = PriceSeries::from_closes(
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        &v_shape(),
    );
    let frame = compute_macd(&series, ParameterSet::new(3, 6, 3)).unwrap();
    let signals = signals_for_frame(&frame, CrossoverRule::Corrected);
    assert_eq!(signals.len(), 60);

    let events: Vec<(usize, Signal)> = signals
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| *s != Signal::Hold)
        .collect();
    assert_eq!(events, vec![(24, Signal::Buy)]);

    let prev = frame.point(23).unwrap();
    let cur = frame.point(24).unwrap();
    assert!(prev.macd < 0.0 && cur.macd > 0.0);
}

#[test]
fn rules_differ_only_on_signal_line_down_cross() {
    // bar 1: up-cross of signal below zero   → Buy under both rules
    // bar 2: zero up-cross above signal      → Buy under both rules
    // bar 3: down-cross of signal above zero → Sell only when corrected
    // bar 4: zero down-cross below signal    → Sell under both rules
    let frame = frame_from(
        &[-2.0, -0.5, 0.5, 0.1, -0.1],
        &[-1.0, -1.0, -0.5, 0.3, 0.2],
    );
    let corrected = signals_for_frame(&frame, CrossoverRule::Corrected);
    let reference = signals_for_frame(&frame, CrossoverRule::Reference);
    assert_eq!(
        corrected,
        vec![Signal::Hold, Signal::Buy, Signal::Buy, Signal::Sell, Signal::Sell]
    );
    assert_eq!(
        reference,
        vec![Signal::Hold, Signal::Buy, Signal::Buy, Signal::Hold, Signal::Sell]
    );
}

#[test]
fn signals_for_frame_has_one_entry_per_bar() {
    let frame = frame_from(&[f64::NAN, f64::NAN, 1.0], &[f64::NAN, f64::NAN, 0.5]);
    let signals = signals_for_frame(&frame, CrossoverRule::Corrected);
    assert_eq!(signals, vec![Signal::Hold; 3]);
}
