//! Backtest runner — wires together the MACD engine, the simulator, and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: one parameter set on a pre-loaded series. Used by the
//!   optimizer and hold-out validation.
//! - `run_single_backtest()`: takes a full `MacdLabConfig` and loaded data,
//!   records fingerprints. Used by the CLI.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::{ParameterSet, Position, PriceSeries, TradeRecord};
use macdlab_core::engine::{backtest, EquityPoint, SimulationConfig};
use macdlab_core::CoreError;

use crate::config::{ConfigError, MacdLabConfig};
use crate::data_loader::{LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("backtest failed: {0}")]
    Core(#[from] CoreError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub params: ParameterSet,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub initial_cash: f64,
    pub final_equity: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub signal_count: usize,
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// Present only when the run ended without liquidation.
    pub open_position: Option<Position>,
    pub dataset_hash: String,
    #[serde(default)]
    pub config_hash: String,
    #[serde(default)]
    pub has_synthetic: bool,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one parameter set on a series — no I/O.
///
/// Errors are the engine's own: invalid periods, a series too short for
/// them, or a bad price met mid-run.
pub fn run_backtest(
    series: &PriceSeries,
    params: ParameterSet,
    config: &SimulationConfig,
) -> Result<BacktestResult, CoreError> {
    let sim = backtest(series, params, config)?;
    let metrics = PerformanceMetrics::compute(&sim, series);
    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        params,
        metrics,
        signal_count: sim.signal_count(),
        trades: sim.trades,
        equity_curve: sim.equity_curve,
        initial_cash: sim.initial_cash,
        final_equity: sim.final_equity,
        start_date: series.first().map(|b| b.date),
        end_date: series.last().map(|b| b.date),
        bar_count: sim.bar_count,
        warmup_bars: sim.warmup_bars,
        open_position: sim.open_position,
        dataset_hash: series.fingerprint(),
        config_hash: String::new(),
        has_synthetic: false,
    })
}

/// Run the configured strategy parameters on loaded data.
pub fn run_single_backtest(
    config: &MacdLabConfig,
    data: &LoadedData,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let mut result = run_backtest(&data.series, config.strategy, &config.backtest)?;
    result.dataset_hash = data.dataset_hash.clone();
    result.config_hash = config.config_hash()?;
    result.has_synthetic = data.has_synthetic;
    tracing::info!(
        params = %result.params,
        trades = result.trades.len(),
        final_equity = result.final_equity,
        "backtest complete"
    );
    Ok(result)
}
