//! Signal generation — crossover detection and the MACD strategy.
//!
//! Signals are portfolio-agnostic: they see indicator values only, never the
//! account or position. The simulator decides what a signal means given the
//! current position.

pub mod crossover;
pub mod strategy;

pub use crossover::{crossovers, crossovers_with_level, detect, Cross};
pub use strategy::{signals_for_frame, step, CrossoverRule, Signal, StrategyState};
