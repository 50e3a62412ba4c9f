//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve, trade list or closes in,
//! scalar out. No dependencies on the optimizer or data loading.

use serde::{Deserialize, Serialize};

use macdlab_core::domain::{PriceSeries, TradeRecord};
use macdlab_core::engine::{system_quality_number, SimulationResult};

/// Bars per year used for annualization.
pub const BARS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub buy_and_hold_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_trade: f64,
    /// Fraction of bars with an open position.
    pub exposure: f64,
    pub trade_count: usize,
    /// System quality number; `None` with fewer than two trades or no
    /// dispersion in trade returns.
    pub sqn: Option<f64>,
}

impl PerformanceMetrics {
    /// Compute all metrics for a finished simulation over `series`.
    pub fn compute(sim: &SimulationResult, series: &PriceSeries) -> Self {
        let equity: Vec<f64> = sim.equity_curve.iter().map(|p| p.equity).collect();
        let returns = sim.trade_returns();
        let bars = equity.len();
        Self {
            total_return: total_return(sim.initial_cash, sim.final_equity),
            buy_and_hold_return: buy_and_hold_return(&series.closes()),
            cagr: cagr(sim.initial_cash, sim.final_equity, bars),
            sharpe: sharpe_ratio(&equity),
            calmar: calmar_ratio(sim.initial_cash, &equity),
            max_drawdown: max_drawdown(&equity),
            win_rate: win_rate(&sim.trades),
            profit_factor: profit_factor(&sim.trades),
            best_trade: returns.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_trade: returns.iter().copied().reduce(f64::min).unwrap_or(0.0),
            avg_trade: mean_f64(&returns),
            exposure: if bars == 0 {
                0.0
            } else {
                sim.bars_in_market as f64 / bars as f64
            },
            trade_count: sim.trades.len(),
            sqn: system_quality_number(&returns),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

/// Return of buying at the first close and holding to the last.
pub fn buy_and_hold_return(closes: &[f64]) -> f64 {
    match (closes.first(), closes.last()) {
        (Some(&first), Some(&last)) if first > 0.0 && closes.len() >= 2 => last / first - 1.0,
        _ => 0.0,
    }
}

/// Compound Annual Growth Rate over `bars` periods.
///
/// Assumes 252 bars per year. Returns 0.0 for fewer than two bars or a
/// non-positive end point.
pub fn cagr(initial: f64, final_equity: f64, bars: usize) -> f64 {
    if bars < 2 || initial <= 0.0 || final_equity <= 0.0 {
        return 0.0;
    }
    let years = bars as f64 / BARS_PER_YEAR;
    (final_equity / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio of bar-to-bar equity returns (zero risk-free rate).
///
/// Returns 0.0 if variance is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * BARS_PER_YEAR.sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
///
/// Returns 0.0 if max drawdown is zero or CAGR is non-positive.
pub fn calmar_ratio(initial: f64, equity_curve: &[f64]) -> f64 {
    let final_equity = match equity_curve.last() {
        Some(&eq) => eq,
        None => return 0.0,
    };
    let c = cagr(initial, final_equity, equity_curve.len());
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = match equity_curve.first() {
        Some(&eq) => eq,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Bar-to-bar returns of an equity curve.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
