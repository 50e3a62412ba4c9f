//! Bar — one period of price data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily bar.
///
/// Indicators are computed on `close`. `open` is only read when fills are
/// deferred to the next bar's open; bars built from a close alone reuse the
/// close as their open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, close: f64) -> Self {
        Self { date, open, close }
    }

    /// Build a bar from a close price only (open = close).
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            close,
        }
    }

    /// True when both prices are finite and strictly positive.
    pub fn is_tradable(&self) -> bool {
        is_valid_price(self.open) && is_valid_price(self.close)
    }
}

/// A price the simulator can fill at: finite and > 0.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 100.0, 103.0)
    }

    #[test]
    fn from_close_copies_close_into_open() {
        let bar = Bar::from_close(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 42.0);
        assert_eq!(bar.open, 42.0);
        assert_eq!(bar.close, 42.0);
    }

    #[test]
    fn tradable_rejects_nan_and_non_positive() {
        assert!(sample_bar().is_tradable());

        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(!bar.is_tradable());

        let mut bar = sample_bar();
        bar.open = 0.0;
        assert!(!bar.is_tradable());

        let mut bar = sample_bar();
        bar.close = f64::INFINITY;
        assert!(!bar.is_tradable());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
