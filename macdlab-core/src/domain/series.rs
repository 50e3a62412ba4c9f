//! PriceSeries — the time-ordered bar sequence that drives the simulation clock.

use std::ops::Range;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::bar::{is_valid_price, Bar};
use crate::error::CoreError;

/// Ordered, deduplicated sequence of bars.
///
/// Construction enforces strictly increasing dates. Prices are not checked
/// here: a non-finite or non-positive price is reported by the simulator as
/// a simulation error when it is reached. Use [`PriceSeries::validate_prices`]
/// for an upfront check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, rejecting non-monotonic or duplicate dates.
    pub fn new(bars: Vec<Bar>) -> Result<Self, CoreError> {
        for (i, pair) in bars.windows(2).enumerate() {
            let (prev, cur) = (pair[0].date, pair[1].date);
            if cur == prev {
                return Err(CoreError::InvalidInput(format!(
                    "duplicate date {cur} at bar {}",
                    i + 1
                )));
            }
            if cur < prev {
                return Err(CoreError::InvalidInput(format!(
                    "non-monotonic date {cur} at bar {} (previous {prev})",
                    i + 1
                )));
            }
        }
        Ok(Self { bars })
    }

    /// Build a series of consecutive calendar days from close prices.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar::from_close(start + Duration::days(i as i64), close))
            .collect();
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Close prices, aligned 1:1 with the bars.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Sub-series over a bar index range. Ordering is inherited.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.bars.len());
        let start = range.start.min(end);
        Self {
            bars: self.bars[start..end].to_vec(),
        }
    }

    /// Split into (bars before `date`, bars on or after `date`).
    pub fn split_at_date(&self, date: NaiveDate) -> (Self, Self) {
        let idx = self.bars.partition_point(|b| b.date < date);
        (self.slice(0..idx), self.slice(idx..self.bars.len()))
    }

    /// Bars whose date falls in `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date <= end);
        self.slice(lo..hi.max(lo))
    }

    /// Strict price check: every open and close finite and positive.
    pub fn validate_prices(&self) -> Result<(), CoreError> {
        match self.bars.iter().position(|b| !b.is_tradable()) {
            None => Ok(()),
            Some(i) => {
                let bar = &self.bars[i];
                let bad = if is_valid_price(bar.open) {
                    bar.close
                } else {
                    bar.open
                };
                Err(CoreError::InvalidInput(format!(
                    "invalid price {bad} at bar {i} ({})",
                    bar.date
                )))
            }
        }
    }

    /// Deterministic BLAKE3 fingerprint over dates and prices.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl TryFrom<Vec<Bar>> for PriceSeries {
    type Error = CoreError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<Bar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}
