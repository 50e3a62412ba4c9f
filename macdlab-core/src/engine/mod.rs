//! Execution simulator: cash account, configuration, and the bar loop.

pub mod account;
pub mod config;
pub mod quality;
pub mod simulator;

pub use account::{Account, EquityPoint};
pub use config::{SimulationConfig, SizingPolicy, TradeTiming, TradingMode, DEFAULT_INITIAL_CASH};
pub use quality::system_quality_number;
pub use simulator::{backtest, simulate, SimulationResult};
