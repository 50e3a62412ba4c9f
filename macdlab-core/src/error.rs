//! Error taxonomy shared by the indicator engine and the simulator.
//!
//! Every variant is a deterministic function of (series, parameters): callers
//! never retry. The optimizer records a failed run with undefined fitness and
//! moves on.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced synchronously by a single indicator computation or
/// simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Malformed period configuration (zero period, fast >= slow).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The series is shorter than `slow_period + signal_period`.
    #[error("insufficient data: {available} bars < {required} required")]
    InsufficientData { required: usize, available: usize },

    /// Non-monotonic or duplicate timestamps, or non-finite prices where the
    /// caller asked for strict validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-positive or non-finite price met by the simulator.
    #[error("simulation error at bar {bar_index} ({date}): {reason}")]
    Simulation {
        bar_index: usize,
        date: NaiveDate,
        reason: String,
    },
}

impl CoreError {
    /// Short machine-friendly tag, used in sweep diagnostics and CSV exports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::InvalidInput(_) => "invalid_input",
            Self::Simulation { .. } => "simulation_error",
        }
    }
}
