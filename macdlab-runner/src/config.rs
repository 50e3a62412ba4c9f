//! Serializable run configuration, loadable from TOML.
//!
//! ```toml
//! [backtest]
//! initial_cash = 1000000.0
//! trade_timing = "on_next_open"
//! crossover_rule = "corrected"
//!
//! [strategy]
//! fast_period = 12
//! slow_period = 26
//! signal_period = 9
//!
//! [grid]
//! fast = { start = 5, end = 50 }
//! slow = { start = 5, end = 50 }
//! signal = { start = 5, end = 50 }
//! constraint = { kind = "fast_below_slow" }
//!
//! [optimizer]
//! fitness = "sqn"
//! threads = 0
//!
//! [validation]
//! split_date = "2019-01-01"
//! ```

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::ParameterSet;
use macdlab_core::engine::SimulationConfig;

use crate::fitness::FitnessMetric;
use crate::grid::ParamGrid;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("failed to parse config TOML: {0}")]
    Parse(String),
    #[error("failed to serialize config: {0}")]
    Serialize(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub fitness: FitnessMetric,
    /// Evaluate grid points on a rayon worker pool.
    pub parallel: bool,
    /// Worker count; 0 uses rayon's default.
    pub threads: usize,
    /// How many ranked results reports keep.
    pub top_n: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            fitness: FitnessMetric::Sqn,
            parallel: true,
            threads: 0,
            top_n: 10,
        }
    }
}

/// Hold-out validation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Train on bars before this date, test on bars on or after it.
    pub split_date: Option<NaiveDate>,
}

/// Complete configuration. Every section is optional in TOML and falls back
/// to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdLabConfig {
    pub backtest: SimulationConfig,
    /// Parameters for a single run.
    pub strategy: ParameterSet,
    pub grid: ParamGrid,
    pub optimizer: OptimizerConfig,
    pub validation: ValidationConfig,
}

impl MacdLabConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backtest
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.strategy
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("strategy: {e}")))?;
        self.grid
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("grid: {e}")))?;
        if self.optimizer.top_n == 0 {
            return Err(ConfigError::Invalid("optimizer.top_n must be positive".into()));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the full configuration.
    ///
    /// Two configs with identical settings hash identically, so reports can
    /// be matched to the settings that produced them.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
