//! Cash account with at most one open position.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::config::SizingPolicy;
use crate::domain::{Position, PositionSide, TradeRecord};

/// Equity at one bar close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Cash, the open position, and the history of both.
///
/// Equity identity: `equity = cash + position.market_value(price)`.
#[derive(Debug, Clone)]
pub struct Account {
    cash: f64,
    position: Option<Position>,
    trades: Vec<TradeRecord>,
    equity_history: Vec<EquityPoint>,
    bars_in_market: usize,
}

impl Account {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            position: None,
            trades: Vec::new(),
            equity_history: Vec::new(),
            bars_in_market: 0,
        }
    }

    pub fn side(&self) -> PositionSide {
        self.position.map_or(PositionSide::Flat, |p| p.side)
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.map_or(0.0, |p| p.market_value(price))
    }

    /// Open a position with all available cash.
    ///
    /// Returns false (and changes nothing) when a position is already open,
    /// `side` is Flat, or whole-unit sizing cannot afford a single unit.
    pub fn open(
        &mut self,
        side: PositionSide,
        bar_index: usize,
        date: NaiveDate,
        price: f64,
        sizing: SizingPolicy,
    ) -> bool {
        if self.position.is_some() || self.cash <= 0.0 {
            return false;
        }
        let raw = self.cash / price;
        let size = match sizing {
            SizingPolicy::AllCashFractional => raw,
            SizingPolicy::AllCashWholeUnits => raw.floor(),
        };
        if size <= 0.0 {
            return false;
        }

        match side {
            PositionSide::Long => self.cash -= size * price,
            PositionSide::Short => self.cash += size * price,
            PositionSide::Flat => return false,
        }
        self.position = Some(Position {
            side,
            entry_price: price,
            size,
            entry_bar: bar_index,
            entry_date: date,
        });
        tracing::trace!(bar = bar_index, %date, price, size, ?side, "position opened");
        true
    }

    /// Close the open position, if any, and record the round trip.
    pub fn close(
        &mut self,
        bar_index: usize,
        date: NaiveDate,
        price: f64,
        forced: bool,
    ) -> Option<&TradeRecord> {
        let pos = self.position.take()?;
        match pos.side {
            PositionSide::Long => self.cash += pos.size * price,
            PositionSide::Short => self.cash -= pos.size * price,
            PositionSide::Flat => {}
        }
        let trade = TradeRecord {
            side: pos.side,
            entry_bar: pos.entry_bar,
            entry_date: pos.entry_date,
            entry_price: pos.entry_price,
            exit_bar: bar_index,
            exit_date: date,
            exit_price: price,
            size: pos.size,
            pnl: pos.unrealized_pnl(price),
            bars_held: bar_index.saturating_sub(pos.entry_bar),
            forced_exit: forced,
        };
        tracing::trace!(bar = bar_index, %date, price, pnl = trade.pnl, forced, "position closed");
        self.trades.push(trade);
        self.trades.last()
    }

    /// Mark to market at `price` and append to the equity history.
    pub fn record_equity(&mut self, date: NaiveDate, price: f64) -> f64 {
        if self.position.is_some() {
            self.bars_in_market += 1;
        }
        let equity = self.equity(price);
        self.equity_history.push(EquityPoint { date, equity });
        equity
    }

    /// Overwrite the most recent equity point (after an end-of-run liquidation).
    pub fn restate_last_equity(&mut self, price: f64) {
        let equity = self.equity(price);
        if let Some(last) = self.equity_history.last_mut() {
            last.equity = equity;
        }
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn equity_history(&self) -> &[EquityPoint] {
        &self.equity_history
    }

    pub fn bars_in_market(&self) -> usize {
        self.bars_in_market
    }

    /// Consume the account into (trades, equity history, open position).
    pub fn into_parts(self) -> (Vec<TradeRecord>, Vec<EquityPoint>, Option<Position>) {
        (self.trades, self.equity_history, self.position)
    }
}
