//! Optimization surface — one `RunResult` per evaluated grid point.
//!
//! Keyed by `ParameterSet` in a `BTreeMap`, so enumeration order is the
//! grid order regardless of which worker finished first. Read-only once the
//! sweep returns.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::ParameterSet;
use macdlab_core::CoreError;

use crate::fitness::FitnessMetric;
use crate::runner::BacktestResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("no viable parameters: all {evaluated} evaluated combinations have undefined fitness")]
    NoViableParameters { evaluated: usize },
}

/// Summary of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub params: ParameterSet,
    /// `None` when the run failed.
    pub final_equity: Option<f64>,
    /// `None` when the run failed or the metric is undefined for it.
    pub fitness: Option<f64>,
    pub trade_count: usize,
    pub total_return: Option<f64>,
    /// Error tag of a failed run (`insufficient_data`, ...).
    pub error: Option<String>,
}

impl RunResult {
    pub fn from_backtest(result: &BacktestResult, metric: FitnessMetric) -> Self {
        Self {
            params: result.params,
            final_equity: Some(result.final_equity),
            fitness: metric.extract(&result.metrics),
            trade_count: result.trades.len(),
            total_return: Some(result.metrics.total_return),
            error: None,
        }
    }

    pub fn failed(params: ParameterSet, error: &CoreError) -> Self {
        Self {
            params,
            final_equity: None,
            fitness: None,
            trade_count: 0,
            total_return: None,
            error: Some(error.kind().to_string()),
        }
    }

    pub fn is_viable(&self) -> bool {
        self.fitness.is_some()
    }
}

/// Selection order: fitness descending, then slow, fast and signal period
/// ascending. Undefined fitness sorts last.
pub fn rank_order(a: &RunResult, b: &RunResult) -> Ordering {
    let by_fitness = match (a.fitness, b.fitness) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_fitness
        .then(a.params.slow_period.cmp(&b.params.slow_period))
        .then(a.params.fast_period.cmp(&b.params.fast_period))
        .then(a.params.signal_period.cmp(&b.params.signal_period))
}

/// Axis collapsed by a 2-D reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Fast,
    Slow,
    Signal,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Slow => "slow",
            Self::Signal => "signal",
        }
    }

    /// The two remaining axes, in (fast, slow, signal) order.
    pub fn remaining(&self) -> (Axis, Axis) {
        match self {
            Self::Fast => (Self::Slow, Self::Signal),
            Self::Slow => (Self::Fast, Self::Signal),
            Self::Signal => (Self::Fast, Self::Slow),
        }
    }

    fn value(&self, params: &ParameterSet) -> usize {
        match self {
            Self::Fast => params.fast_period,
            Self::Slow => params.slow_period,
            Self::Signal => params.signal_period,
        }
    }
}

/// How values along the collapsed axis combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    #[default]
    Mean,
    Max,
    Min,
    Count,
}

impl Reducer {
    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Count => values.len() as f64,
        }
    }
}

/// A 2-D table keyed by (row, column) values of the remaining axes.
///
/// Cells whose every underlying fitness was undefined are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface2D {
    pub row_axis: Axis,
    pub col_axis: Axis,
    pub reducer: Reducer,
    cells: BTreeMap<(usize, usize), f64>,
}

impl Surface2D {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(&(row, col)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in (row, col) order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.cells.iter().map(|(&k, &v)| (k, v))
    }

    /// Distinct row values, ascending.
    pub fn rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.cells.keys().map(|&(r, _)| r).collect();
        rows.dedup();
        rows
    }

    /// Distinct column values, ascending.
    pub fn cols(&self) -> Vec<usize> {
        let mut cols: Vec<usize> = self.cells.keys().map(|&(_, c)| c).collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }
}

/// Mapping from every evaluated `ParameterSet` to its `RunResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationSurface {
    metric: FitnessMetric,
    results: BTreeMap<ParameterSet, RunResult>,
}

impl OptimizationSurface {
    pub fn new(metric: FitnessMetric) -> Self {
        Self {
            metric,
            results: BTreeMap::new(),
        }
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    /// Insert a result, returning the previous one for the same parameters.
    pub fn insert(&mut self, result: RunResult) -> Option<RunResult> {
        self.results.insert(result.params, result)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results in parameter order.
    pub fn iter(&self) -> impl Iterator<Item = &RunResult> {
        self.results.values()
    }

    pub fn get(&self, params: &ParameterSet) -> Option<&RunResult> {
        self.results.get(params)
    }

    pub fn viable_count(&self) -> usize {
        self.iter().filter(|r| r.is_viable()).count()
    }

    /// The best viable result under [`rank_order`].
    pub fn best(&self) -> Result<&RunResult, SurfaceError> {
        self.iter()
            .filter(|r| r.is_viable())
            .min_by(|a, b| rank_order(a, b))
            .ok_or(SurfaceError::NoViableParameters {
                evaluated: self.len(),
            })
    }

    /// Up to `n` viable results, best first.
    pub fn top_n(&self, n: usize) -> Vec<&RunResult> {
        let mut viable: Vec<&RunResult> = self.iter().filter(|r| r.is_viable()).collect();
        viable.sort_by(|a, b| rank_order(a, b));
        viable.truncate(n);
        viable
    }

    /// Results with fitness strictly above `threshold`, in parameter order.
    pub fn filter_above(&self, threshold: f64) -> Vec<&RunResult> {
        self.iter()
            .filter(|r| r.fitness.is_some_and(|f| f > threshold))
            .collect()
    }

    /// Collapse `axis` with `reducer`, skipping undefined fitness.
    pub fn reduce(&self, axis: Axis, reducer: Reducer) -> Surface2D {
        let (row_axis, col_axis) = axis.remaining();
        let mut groups: BTreeMap<(usize, usize), Vec<f64>> = BTreeMap::new();
        for r in self.iter() {
            if let Some(f) = r.fitness {
                groups
                    .entry((row_axis.value(&r.params), col_axis.value(&r.params)))
                    .or_default()
                    .push(f);
            }
        }
        let cells = groups
            .into_iter()
            .map(|(key, values)| (key, reducer.apply(&values)))
            .collect();
        Surface2D {
            row_axis,
            col_axis,
            reducer,
            cells,
        }
    }
}
