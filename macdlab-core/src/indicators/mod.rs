//! Indicator engine.
//!
//! Indicators are pure functions of the full close series, precomputed once
//! before the bar loop. No value at bar t depends on bars after t.

pub mod ema;
pub mod macd;

pub use ema::ema_of_series;
pub use macd::{compute_macd, macd_of_closes, IndicatorFrame, MacdPoint};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
