//! MacdLab Runner — orchestration around the core engine.
//!
//! This crate builds on `macdlab-core` to provide:
//! - TOML configuration with documented defaults
//! - CSV price loading and seeded synthetic series
//! - Single-backtest runner with performance metrics
//! - Grid optimizer over (fast, slow, signal) with a parallel worker pool
//! - Optimization surface: best selection, ranking, 2-D reductions
//! - Hold-out validation
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fitness;
pub mod grid;
pub mod metrics;
pub mod optimizer;
pub mod runner;
pub mod surface;
pub mod validation;

pub use config::{ConfigError, MacdLabConfig, OptimizerConfig, ValidationConfig};
pub use data_loader::{load_csv, load_synthetic, DataSource, LoadError, LoadedData};
pub use fitness::FitnessMetric;
pub use grid::{Constraint, ParamGrid, PeriodRange};
pub use metrics::PerformanceMetrics;
pub use optimizer::{OptimizeError, Optimizer, SweepOutcome, SweepReport};
pub use runner::{run_backtest, run_single_backtest, BacktestResult, RunError, SCHEMA_VERSION};
pub use surface::{Axis, OptimizationSurface, Reducer, RunResult, Surface2D, SurfaceError};
pub use validation::{holdout_validate, HoldoutReport, ValidationError};
