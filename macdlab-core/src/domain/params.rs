//! ParameterSet — one point of the MACD parameter grid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// MACD periods: fast EMA, slow EMA, signal EMA.
///
/// Ordering is lexicographic (fast, slow, signal), which gives the optimizer
/// surface a stable iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterSet {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl ParameterSet {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }

    /// Check that every period is positive and fast < slow.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fast_period == 0 || self.slow_period == 0 || self.signal_period == 0 {
            return Err(CoreError::InvalidParameter(format!(
                "periods must be positive, got {self}"
            )));
        }
        if self.fast_period >= self.slow_period {
            return Err(CoreError::InvalidParameter(format!(
                "fast period {} must be below slow period {}",
                self.fast_period, self.slow_period
            )));
        }
        Ok(())
    }

    /// Number of leading bars with an undefined signal line.
    pub fn warmup_bars(&self) -> usize {
        (self.slow_period + self.signal_period).saturating_sub(2)
    }

    /// Minimum series length accepted by the indicator engine.
    pub fn min_bars(&self) -> usize {
        self.slow_period + self.signal_period
    }
}

impl Default for ParameterSet {
    /// The conventional 12/26/9 MACD.
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fast={} slow={} signal={}",
            self.fast_period, self.slow_period, self.signal_period
        )
    }
}
