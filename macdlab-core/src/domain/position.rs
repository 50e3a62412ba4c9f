//! Position — the single open exposure of a simulation account.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction of the account's exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionSide {
    #[default]
    Flat,
    Long,
    Short,
}

/// An open position. `size` is always non-negative; `side` carries direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    pub size: f64,
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
}

impl Position {
    /// Signed market value: positive for longs, negative for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => self.size * price,
            PositionSide::Short => -self.size * price,
            PositionSide::Flat => 0.0,
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => self.size * (price - self.entry_price),
            PositionSide::Short => self.size * (self.entry_price - price),
            PositionSide::Flat => 0.0,
        }
    }
}
