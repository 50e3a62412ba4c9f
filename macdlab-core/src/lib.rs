//! MacdLab Core — price series, MACD indicator, crossover signals, simulator.
//!
//! This crate contains the sequential, deterministic half of the system:
//! - Domain types (bars, price series, parameter sets, positions, trades)
//! - EMA and MACD indicator engine with an explicit warm-up window
//! - Crossover detection and the MACD strategy state machine
//! - Single-position execution simulator with configurable fill timing
//!
//! Everything here is a pure function of (series, parameters, config) and
//! safe to call from many threads at once.

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod signals;

pub use error::CoreError;
