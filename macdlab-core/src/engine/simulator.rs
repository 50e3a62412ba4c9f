//! Single-position execution simulator.
//!
//! Two phases per bar:
//! 1. Start-of-bar: fill the signal deferred from the previous bar at this
//!    bar's open (`OnNextOpen` only).
//! 2. End-of-bar: advance the strategy state machine with this bar's MACD
//!    point, fill immediately at the close (`OnClose`) or defer, then mark
//!    to market at the close.
//!
//! The strategy reads `frame.point(t)` and its own memory of bar t-1, never
//! anything later, even though the frame was computed over the whole series.

use serde::{Deserialize, Serialize};

use super::account::{Account, EquityPoint};
use super::config::{SimulationConfig, SizingPolicy, TradeTiming, TradingMode};
use super::quality::system_quality_number;
use crate::domain::{is_valid_price, Bar, ParameterSet, Position, PositionSide, PriceSeries, TradeRecord};
use crate::error::CoreError;
use crate::indicators::{compute_macd, IndicatorFrame};
use crate::signals::{step, Signal, StrategyState};

/// Everything one simulation run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub params: ParameterSet,
    pub initial_cash: f64,
    pub final_equity: f64,
    /// One point per bar, at the close.
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    /// One signal per bar, as emitted by the strategy.
    pub signals: Vec<Signal>,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub bars_in_market: usize,
    /// Position still open at the end (only when force-close is off).
    pub open_position: Option<Position>,
}

impl SimulationResult {
    /// Per-trade returns relative to entry notional.
    pub fn trade_returns(&self) -> Vec<f64> {
        self.trades.iter().map(TradeRecord::return_pct).collect()
    }

    /// System quality number over the trade returns.
    pub fn sqn(&self) -> Option<f64> {
        system_quality_number(&self.trade_returns())
    }

    /// Count of non-Hold signals.
    pub fn signal_count(&self) -> usize {
        self.signals.iter().filter(|s| **s != Signal::Hold).count()
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn total_return(&self) -> f64 {
        self.final_equity / self.initial_cash - 1.0
    }
}

/// Compute the MACD frame and simulate it in one call.
pub fn backtest(
    series: &PriceSeries,
    params: ParameterSet,
    config: &SimulationConfig,
) -> Result<SimulationResult, CoreError> {
    let frame = compute_macd(series, params)?;
    simulate(series, &frame, config)
}

/// Run the bar loop over a precomputed frame.
///
/// Fails with `InvalidInput` when the frame is not aligned with the series,
/// and with `Simulation` at the first bar whose open or close is
/// non-positive or non-finite. A failed run records nothing.
pub fn simulate(
    series: &PriceSeries,
    frame: &IndicatorFrame,
    config: &SimulationConfig,
) -> Result<SimulationResult, CoreError> {
    config.validate()?;
    if frame.len() != series.len() {
        return Err(CoreError::InvalidInput(format!(
            "indicator frame has {} rows for {} bars",
            frame.len(),
            series.len()
        )));
    }

    let bars = series.bars();
    let mut account = Account::new(config.initial_cash);
    let mut state = StrategyState::default();
    let mut pending: Option<Signal> = None;
    let mut signals = Vec::with_capacity(bars.len());

    for (t, bar) in bars.iter().enumerate() {
        check_bar(t, bar)?;

        // ─── Start-of-bar ───
        if let Some(signal) = pending.take() {
            apply_signal(&mut account, signal, t, bar, bar.open, config);
        }

        // ─── End-of-bar ───
        let (next, signal) = step(config.crossover_rule, state, frame.point(t));
        state = next;
        signals.push(signal);

        if signal != Signal::Hold {
            match config.trade_timing {
                TradeTiming::OnClose => apply_signal(&mut account, signal, t, bar, bar.close, config),
                TradeTiming::OnNextOpen => pending = Some(signal),
            }
        }

        account.record_equity(bar.date, bar.close);
    }

    if let Some(signal) = pending {
        tracing::trace!(?signal, "signal on final bar has no next open; dropped");
    }

    if config.force_close_at_end {
        if let Some((t, last)) = bars.iter().enumerate().last() {
            if account.close(t, last.date, last.close, true).is_some() {
                account.restate_last_equity(last.close);
            }
        }
    }

    let final_equity = account
        .equity_history()
        .last()
        .map_or(config.initial_cash, |p| p.equity);
    let bars_in_market = account.bars_in_market();
    let (trades, equity_curve, open_position) = account.into_parts();

    Ok(SimulationResult {
        params: frame.params,
        initial_cash: config.initial_cash,
        final_equity,
        equity_curve,
        trades,
        signals,
        bar_count: bars.len(),
        warmup_bars: frame.warmup_bars(),
        bars_in_market,
        open_position,
    })
}

fn check_bar(t: usize, bar: &Bar) -> Result<(), CoreError> {
    for (label, price) in [("open", bar.open), ("close", bar.close)] {
        if !is_valid_price(price) {
            return Err(CoreError::Simulation {
                bar_index: t,
                date: bar.date,
                reason: format!("{label} price {price} is not a positive finite number"),
            });
        }
    }
    Ok(())
}

/// Translate a signal into account transitions given the current side.
///
/// Buy while Long and Sell while Short are no-ops (no pyramiding). In
/// long-only mode a Sell while Flat is a no-op too.
fn apply_signal(
    account: &mut Account,
    signal: Signal,
    t: usize,
    bar: &Bar,
    price: f64,
    config: &SimulationConfig,
) {
    let sizing: SizingPolicy = config.sizing;
    let date = bar.date;
    match (signal, account.side(), config.trading_mode) {
        (Signal::Buy, PositionSide::Flat, _) => {
            account.open(PositionSide::Long, t, date, price, sizing);
        }
        (Signal::Buy, PositionSide::Short, _) => {
            account.close(t, date, price, false);
            account.open(PositionSide::Long, t, date, price, sizing);
        }
        (Signal::Sell, PositionSide::Long, TradingMode::LongOnly) => {
            account.close(t, date, price, false);
        }
        (Signal::Sell, PositionSide::Long, TradingMode::LongShort) => {
            account.close(t, date, price, false);
            account.open(PositionSide::Short, t, date, price, sizing);
        }
        (Signal::Sell, PositionSide::Flat, TradingMode::LongShort) => {
            account.open(PositionSide::Short, t, date, price, sizing);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::MacdPoint;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Frame whose points produce exactly the requested signal per bar
    /// under the corrected rule: Buy = up-cross of signal, Sell = down-cross.
    fn scripted_frame(signals: &[Signal]) -> IndicatorFrame {
        // Bar 0 sits below the signal line; each scripted Buy/Sell flips
        // the relationship, Hold keeps it.
        let mut above = false;
        let mut macd = vec![-1.0];
        let mut signal = vec![0.0];
        for s in signals.iter().skip(1) {
            match s {
                Signal::Buy if !above => above = true,
                Signal::Sell if above => above = false,
                _ => {}
            }
            macd.push(if above { 1.0 } else { -1.0 });
            signal.push(0.0);
        }
        let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
        IndicatorFrame {
            params: ParameterSet::new(1, 2, 1),
            macd,
            signal,
            histogram,
        }
    }

    fn on_close() -> SimulationConfig {
        SimulationConfig::default()
            .with_timing(TradeTiming::OnClose)
            .with_initial_cash(1_000.0)
    }

    #[test]
    fn misaligned_frame_is_invalid_input() {
        let series = PriceSeries::from_closes(start(), &[10.0, 11.0, 12.0]);
        let frame = scripted_frame(&[Signal::Hold, Signal::Hold]);
        let err = simulate(&series, &frame, &on_close()).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn buy_then_sell_on_close() {
        let series = PriceSeries::from_closes(start(), &[10.0, 10.0, 12.0, 15.0, 15.0]);
        let script = [Signal::Hold, Signal::Hold, Signal::Buy, Signal::Sell, Signal::Hold];
        let frame = scripted_frame(&script);
        let r = simulate(&series, &frame, &on_close()).unwrap();
        assert_eq!(r.signals, script.to_vec());
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].entry_price, 12.0);
        assert_eq!(r.trades[0].exit_price, 15.0);
        assert!((r.final_equity - 1_250.0).abs() < 1e-9);
    }

    #[test]
    fn next_open_defers_fill() {
        let date = |i: i64| start() + chrono::Duration::days(i);
        let bars = vec![
            Bar::new(date(0), 10.0, 10.0),
            Bar::new(date(1), 10.0, 10.0),
            Bar::new(date(2), 11.0, 12.0),
            Bar::new(date(3), 20.0, 21.0),
        ];
        let series = PriceSeries::new(bars).unwrap();
        let frame = scripted_frame(&[Signal::Hold, Signal::Buy, Signal::Hold, Signal::Hold]);
        let cfg = SimulationConfig::default().with_initial_cash(1_100.0);
        let r = simulate(&series, &frame, &cfg).unwrap();
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].entry_bar, 2);
        assert_eq!(r.trades[0].entry_price, 11.0);
        assert!(r.trades[0].forced_exit);
        assert!((r.final_equity - 2_100.0).abs() < 1e-9);
    }

    #[test]
    fn signal_on_last_bar_is_dropped_with_next_open() {
        let series = PriceSeries::from_closes(start(), &[10.0, 10.0, 10.0]);
        let frame = scripted_frame(&[Signal::Hold, Signal::Hold, Signal::Buy]);
        let r = simulate(&series, &frame, &SimulationConfig::default()).unwrap();
        assert_eq!(r.signal_count(), 1);
        assert!(r.trades.is_empty());
        assert_eq!(r.final_equity, r.initial_cash);
    }

    #[test]
    fn without_force_close_position_stays_open() {
        let series = PriceSeries::from_closes(start(), &[10.0, 10.0, 20.0]);
        let frame = scripted_frame(&[Signal::Hold, Signal::Buy, Signal::Hold]);
        let cfg = on_close().with_force_close(false);
        let r = simulate(&series, &frame, &cfg).unwrap();
        assert!(r.trades.is_empty());
        assert!(r.open_position.is_some());
        assert!((r.final_equity - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn undefined_points_hold() {
        let series = PriceSeries::from_closes(start(), &[10.0; 4]);
        let frame = IndicatorFrame {
            params: ParameterSet::new(1, 2, 1),
            macd: vec![f64::NAN, f64::NAN, -1.0, 1.0],
            signal: vec![f64::NAN, f64::NAN, 0.0, 0.0],
            histogram: vec![f64::NAN, f64::NAN, -1.0, 1.0],
        };
        let r = simulate(&series, &frame, &on_close()).unwrap();
        assert_eq!(r.signals[..3], [Signal::Hold; 3]);
        assert_eq!(r.signals[3], Signal::Buy);
        assert_eq!(frame.point(3).map(|p: MacdPoint| p.macd), Some(1.0));
    }

    #[test]
    fn non_positive_open_fails() {
        let date = |i: i64| start() + chrono::Duration::days(i);
        let bars = vec![Bar::new(date(0), 10.0, 10.0), Bar::new(date(1), 0.0, 10.0)];
        let series = PriceSeries::new(bars).unwrap();
        let frame = scripted_frame(&[Signal::Hold, Signal::Hold]);
        match simulate(&series, &frame, &on_close()) {
            Err(CoreError::Simulation { bar_index, .. }) => assert_eq!(bar_index, 1),
            other => panic!("expected simulation error, got {other:?}"),
        }
    }
}
