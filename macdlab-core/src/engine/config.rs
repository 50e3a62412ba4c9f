//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::signals::CrossoverRule;

/// Default starting cash.
pub const DEFAULT_INITIAL_CASH: f64 = 1_000_000.0;

/// When a signal's order is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeTiming {
    /// Fill at the close of the bar that produced the signal.
    OnClose,
    /// Fill at the open of the following bar. A signal on the last bar
    /// never fills.
    #[default]
    OnNextOpen,
}

/// Which sides the account may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    /// Buy opens a long, Sell closes it. Sell while flat is a no-op.
    #[default]
    LongOnly,
    /// Exclusive orders: an opposite signal closes the open side and opens
    /// the other one.
    LongShort,
}

/// How much to put into a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingPolicy {
    /// All available cash, fractional units.
    #[default]
    AllCashFractional,
    /// All available cash rounded down to whole units. An entry that cannot
    /// afford one unit is skipped.
    AllCashWholeUnits,
}

/// Configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    pub trade_timing: TradeTiming,
    /// Liquidate an open position at the final close.
    pub force_close_at_end: bool,
    pub trading_mode: TradingMode,
    pub sizing: SizingPolicy,
    pub crossover_rule: CrossoverRule,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_cash: DEFAULT_INITIAL_CASH,
            trade_timing: TradeTiming::OnNextOpen,
            force_close_at_end: true,
            trading_mode: TradingMode::LongOnly,
            sizing: SizingPolicy::AllCashFractional,
            crossover_rule: CrossoverRule::Corrected,
        }
    }
}

impl SimulationConfig {
    pub fn with_initial_cash(mut self, cash: f64) -> Self {
        self.initial_cash = cash;
        self
    }

    pub fn with_timing(mut self, timing: TradeTiming) -> Self {
        self.trade_timing = timing;
        self
    }

    pub fn with_trading_mode(mut self, mode: TradingMode) -> Self {
        self.trading_mode = mode;
        self
    }

    pub fn with_force_close(mut self, force_close_at_end: bool) -> Self {
        self.force_close_at_end = force_close_at_end;
        self
    }

    pub fn with_crossover_rule(mut self, rule: CrossoverRule) -> Self {
        self.crossover_rule = rule;
        self
    }

    pub fn with_sizing(mut self, sizing: SizingPolicy) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "initial cash must be positive, got {}",
                self.initial_cash
            )));
        }
        Ok(())
    }
}
