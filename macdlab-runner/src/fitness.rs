//! Fitness function — configurable metric selector for ranking parameter sets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceMetrics;

/// Which metric the optimizer maximizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    /// System quality number over per-trade returns.
    #[default]
    Sqn,
    Sharpe,
    TotalReturn,
    WinRate,
    ProfitFactor,
    Calmar,
}

impl FitnessMetric {
    /// Extract the fitness value, or `None` when it is undefined for this run.
    ///
    /// SQN is undefined below two trades. Any non-finite value is undefined.
    pub fn extract(&self, metrics: &PerformanceMetrics) -> Option<f64> {
        let value = match self {
            Self::Sqn => metrics.sqn?,
            Self::Sharpe => metrics.sharpe,
            Self::TotalReturn => metrics.total_return,
            Self::WinRate => metrics.win_rate,
            Self::ProfitFactor => metrics.profit_factor,
            Self::Calmar => metrics.calmar,
        };
        value.is_finite().then_some(value)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqn => "sqn",
            Self::Sharpe => "sharpe",
            Self::TotalReturn => "total_return",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::Calmar => "calmar",
        }
    }
}

impl FromStr for FitnessMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sqn" => Ok(Self::Sqn),
            "sharpe" => Ok(Self::Sharpe),
            "total_return" => Ok(Self::TotalReturn),
            "win_rate" => Ok(Self::WinRate),
            "profit_factor" => Ok(Self::ProfitFactor),
            "calmar" => Ok(Self::Calmar),
            other => Err(format!(
                "unknown fitness metric '{other}' (expected sqn, sharpe, total_return, win_rate, profit_factor, calmar)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            total_return: 0.15,
            buy_and_hold_return: 0.10,
            cagr: 0.12,
            sharpe: 1.5,
            calmar: 1.2,
            max_drawdown: -0.10,
            win_rate: 0.55,
            profit_factor: 1.8,
            best_trade: 0.08,
            worst_trade: -0.04,
            avg_trade: 0.01,
            exposure: 0.6,
            trade_count: 20,
            sqn: Some(2.1),
        }
    }

    #[test]
    fn extract_sqn() {
        let m = sample_metrics();
        assert_eq!(FitnessMetric::Sqn.extract(&m), Some(2.1));
    }

    #[test]
    fn undefined_sqn_is_none() {
        let m = PerformanceMetrics {
            sqn: None,
            ..sample_metrics()
        };
        assert_eq!(FitnessMetric::Sqn.extract(&m), None);
        assert_eq!(FitnessMetric::Sharpe.extract(&m), Some(1.5));
    }

    #[test]
    fn non_finite_is_none() {
        let m = PerformanceMetrics {
            sharpe: f64::NAN,
            ..sample_metrics()
        };
        assert_eq!(FitnessMetric::Sharpe.extract(&m), None);
    }

    #[test]
    fn default_is_sqn() {
        assert_eq!(FitnessMetric::default(), FitnessMetric::Sqn);
    }

    #[test]
    fn serde_names() {
        let m: FitnessMetric = serde_json::from_str("\"total_return\"").unwrap();
        assert_eq!(m, FitnessMetric::TotalReturn);
        assert_eq!(m.name(), "total_return");
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("sqn".parse::<FitnessMetric>(), Ok(FitnessMetric::Sqn));
        assert_eq!("profit-factor".parse::<FitnessMetric>(), Ok(FitnessMetric::ProfitFactor));
        assert!("alpha".parse::<FitnessMetric>().is_err());
    }
}
