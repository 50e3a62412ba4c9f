//! MACD — fast/slow EMA spread, its signal line, and the histogram.
//!
//! macd      = EMA(close, fast) - EMA(close, slow)
//! signal    = EMA(macd, signal)
//! histogram = macd - signal
//!
//! All three columns share one warm-up window of `slow + signal - 2` bars;
//! entries inside it are NaN, so the MACD line never becomes visible before
//! the signal line it is compared against.

use serde::{Deserialize, Serialize};

use super::ema::ema_of_series;
use crate::domain::{ParameterSet, PriceSeries};
use crate::error::CoreError;

/// MACD values aligned 1:1 with a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFrame {
    pub params: ParameterSet,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// The three MACD values at one bar, all defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    /// Number of leading undefined entries.
    pub fn warmup_bars(&self) -> usize {
        self.params.warmup_bars().min(self.len())
    }

    /// The values at `index`, or `None` inside the warm-up window, past the
    /// end, or where a NaN input tainted the EMAs.
    pub fn point(&self, index: usize) -> Option<MacdPoint> {
        let macd = *self.macd.get(index)?;
        let signal = *self.signal.get(index)?;
        let histogram = *self.histogram.get(index)?;
        if macd.is_nan() || signal.is_nan() || histogram.is_nan() {
            return None;
        }
        Some(MacdPoint {
            macd,
            signal,
            histogram,
        })
    }

    /// Per-bar points, `None` where undefined.
    pub fn points(&self) -> impl Iterator<Item = Option<MacdPoint>> + '_ {
        (0..self.len()).map(move |i| self.point(i))
    }
}

/// Compute the MACD frame for a price series.
///
/// Fails with `InvalidParameter` for a zero period or fast >= slow, and with
/// `InsufficientData` when the series holds fewer than `slow + signal` bars.
pub fn compute_macd(series: &PriceSeries, params: ParameterSet) -> Result<IndicatorFrame, CoreError> {
    macd_of_closes(&series.closes(), params)
}

/// Same as [`compute_macd`] over a raw close slice.
pub fn macd_of_closes(closes: &[f64], params: ParameterSet) -> Result<IndicatorFrame, CoreError> {
    params.validate()?;
    if closes.len() < params.min_bars() {
        return Err(CoreError::InsufficientData {
            required: params.min_bars(),
            available: closes.len(),
        });
    }

    let fast = ema_of_series(closes, params.fast_period);
    let slow = ema_of_series(closes, params.slow_period);
    let mut macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_of_series(&macd, params.signal_period);

    let warmup = params.warmup_bars();
    for v in macd.iter_mut().take(warmup) {
        *v = f64::NAN;
    }
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Ok(IndicatorFrame {
        params,
        macd,
        signal,
        histogram,
    })
}
