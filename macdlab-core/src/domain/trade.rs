//! TradeRecord — a completed round trip.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// A completed entry → exit round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: PositionSide,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    pub size: f64,
    pub pnl: f64,
    pub bars_held: usize,
    /// Closed by the end-of-series liquidation rather than a signal.
    pub forced_exit: bool,
}

impl TradeRecord {
    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
