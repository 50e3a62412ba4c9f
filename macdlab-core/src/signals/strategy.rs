//! MACD crossover strategy as an explicit state machine.
//!
//! `step(rule, state, point) -> (state, signal)` is the whole strategy. The
//! state holds only the previous bar's MACD point, so a decision at bar t
//! reads bars t-1 and t and nothing later.
//!
//! Decision priority per bar:
//! 1. MACD crosses above signal → Buy
//! 2. MACD crosses below signal → Sell (only under [`CrossoverRule::Corrected`])
//! 3. MACD crosses above zero → Buy
//! 4. MACD crosses below zero → Sell
//! 5. otherwise Hold

use serde::{Deserialize, Serialize};

use super::crossover::{detect, Cross};
use crate::indicators::{IndicatorFrame, MacdPoint};

/// Per-bar trading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

/// How a MACD/signal down-cross is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverRule {
    /// A down-cross of MACD through its signal line sells.
    #[default]
    Corrected,
    /// The legacy rule: the signal-line sell branch re-tests the up-cross
    /// condition and can never fire, so a signal-line down-cross falls
    /// through to the zero-line checks.
    Reference,
}

/// Memory carried between bars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyState {
    prev: Option<MacdPoint>,
}

/// Advance the strategy by one bar.
///
/// `current` is `None` inside the indicator warm-up window; such bars always
/// Hold and leave no memory, so the first defined bar cannot cross.
pub fn step(
    rule: CrossoverRule,
    state: StrategyState,
    current: Option<MacdPoint>,
) -> (StrategyState, Signal) {
    let next = StrategyState { prev: current };
    let (prev, cur) = match (state.prev, current) {
        (Some(p), Some(c)) => (p, c),
        _ => return (next, Signal::Hold),
    };

    let vs_signal = detect(prev.macd, prev.signal, cur.macd, cur.signal);
    let vs_zero = detect(prev.macd, 0.0, cur.macd, 0.0);

    let signal = match (vs_signal, rule) {
        (Cross::Up, _) => Signal::Buy,
        (Cross::Down, CrossoverRule::Corrected) => Signal::Sell,
        _ => match vs_zero {
            Cross::Up => Signal::Buy,
            Cross::Down => Signal::Sell,
            Cross::None => Signal::Hold,
        },
    };

    (next, signal)
}

/// Run the state machine across a whole frame, one signal per bar.
pub fn signals_for_frame(frame: &IndicatorFrame, rule: CrossoverRule) -> Vec<Signal> {
    let mut state = StrategyState::default();
    frame
        .points()
        .map(|point| {
            let (next, signal) = step(rule, state, point);
            state = next;
            signal
        })
        .collect()
}
