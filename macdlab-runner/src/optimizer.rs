//! Grid optimizer — evaluates every `ParameterSet` of a `ParamGrid`.
//!
//! Each grid point is an independent run over the shared, immutable series.
//! Runs are distributed over a rayon pool (or evaluated in order when
//! parallelism is off) and merged into an `OptimizationSurface` keyed by
//! parameters, so the surface is identical however the work was scheduled.
//!
//! Failure policy:
//! 1. A run that fails (bad periods, too little data, bad price) is recorded
//!    with undefined fitness. The sweep continues.
//! 2. A set cancel flag stops dispatching new runs. Runs already in flight
//!    finish and the partial surface is returned.
//! 3. Only a grid that fails validation or a pool that cannot be built
//!    aborts the sweep.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::{ParameterSet, PriceSeries};
use macdlab_core::engine::SimulationConfig;

use crate::config::MacdLabConfig;
use crate::fitness::FitnessMetric;
use crate::grid::ParamGrid;
use crate::runner::{run_backtest, SCHEMA_VERSION};
use crate::surface::{OptimizationSurface, RunResult, SurfaceError};

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Progress callback: (completed, total).
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Result of a sweep, complete or cancelled.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub surface: OptimizationSurface,
    pub cancelled: bool,
    /// Runs that completed and were recorded.
    pub evaluated: usize,
    /// Grid points after the constraint.
    pub total: usize,
}

impl SweepOutcome {
    pub fn best(&self) -> Result<&RunResult, SurfaceError> {
        self.surface.best()
    }
}

/// Serializable summary of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub schema_version: u32,
    pub metric: FitnessMetric,
    pub dataset_hash: String,
    pub config_hash: String,
    pub grid_size: usize,
    pub evaluated: usize,
    pub viable: usize,
    pub cancelled: bool,
    pub best: Option<RunResult>,
    pub top: Vec<RunResult>,
}

impl SweepReport {
    pub fn from_outcome(
        outcome: &SweepOutcome,
        top_n: usize,
        dataset_hash: &str,
        config_hash: &str,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            metric: outcome.surface.metric(),
            dataset_hash: dataset_hash.to_string(),
            config_hash: config_hash.to_string(),
            grid_size: outcome.total,
            evaluated: outcome.evaluated,
            viable: outcome.surface.viable_count(),
            cancelled: outcome.cancelled,
            best: outcome.surface.best().ok().cloned(),
            top: outcome.surface.top_n(top_n).into_iter().cloned().collect(),
        }
    }
}

/// Grid sweep executor.
#[derive(Debug, Clone)]
pub struct Optimizer {
    simulation: SimulationConfig,
    metric: FitnessMetric,
    parallel: bool,
    threads: usize,
}

impl Optimizer {
    pub fn new(simulation: SimulationConfig, metric: FitnessMetric) -> Self {
        Self {
            simulation,
            metric,
            parallel: true,
            threads: 0,
        }
    }

    pub fn from_config(config: &MacdLabConfig) -> Self {
        Self::new(config.backtest.clone(), config.optimizer.fitness)
            .with_parallelism(config.optimizer.parallel)
            .with_threads(config.optimizer.threads)
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Worker count for the parallel pool; 0 uses rayon's default.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    pub fn simulation(&self) -> &SimulationConfig {
        &self.simulation
    }

    /// Evaluate one grid point.
    pub fn evaluate(&self, series: &PriceSeries, params: ParameterSet) -> RunResult {
        match run_backtest(series, params, &self.simulation) {
            Ok(result) => RunResult::from_backtest(&result, self.metric),
            Err(e) => {
                tracing::debug!(%params, error = %e, "run failed; fitness undefined");
                RunResult::failed(params, &e)
            }
        }
    }

    /// Evaluate every grid point that satisfies the grid's constraint.
    ///
    /// `cancel` is checked before each run is dispatched. `progress` is
    /// called after each completed run with (completed, total); under
    /// parallel execution calls may arrive from any worker.
    pub fn sweep(
        &self,
        series: &PriceSeries,
        grid: &ParamGrid,
        cancel: Option<&AtomicBool>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<SweepOutcome, OptimizeError> {
        grid.validate().map_err(OptimizeError::InvalidGrid)?;
        let combos = grid.combinations();
        let total = combos.len();
        tracing::info!(
            total,
            raw = grid.raw_size(),
            metric = self.metric.name(),
            parallel = self.parallel,
            "sweep started"
        );

        let completed = AtomicUsize::new(0);
        let run_one = |params: &ParameterSet| -> Option<RunResult> {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return None;
            }
            let result = self.evaluate(series, *params);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(cb) = progress {
                cb(done, total);
            }
            Some(result)
        };

        let results: Vec<RunResult> = if self.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build()
                .map_err(|e| OptimizeError::ThreadPool(e.to_string()))?;
            pool.install(|| combos.par_iter().filter_map(run_one).collect())
        } else {
            combos.iter().map_while(run_one).collect()
        };

        let mut surface = OptimizationSurface::new(self.metric);
        for r in results {
            surface.insert(r);
        }
        let evaluated = surface.len();
        let cancelled = evaluated < total;
        if cancelled {
            tracing::warn!(evaluated, total, "sweep cancelled; returning partial surface");
        } else {
            tracing::info!(
                evaluated,
                viable = surface.viable_count(),
                "sweep finished"
            );
        }

        Ok(SweepOutcome {
            surface,
            cancelled,
            evaluated,
            total,
        })
    }

    /// Sweep without cancellation and return the best viable result with the
    /// surface.
    pub fn optimize(
        &self,
        series: &PriceSeries,
        grid: &ParamGrid,
    ) -> Result<(SweepOutcome, RunResult), OptimizeError> {
        let outcome = self.sweep(series, grid, None, None)?;
        let best = outcome.best()?.clone();
        Ok((outcome, best))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::load_synthetic;
    use crate::grid::{Constraint, PeriodRange};

    fn small_grid() -> ParamGrid {
        ParamGrid::new(
            PeriodRange::new(3, 5),
            PeriodRange::new(8, 10),
            PeriodRange::new(3, 4),
        )
    }

    #[test]
    fn sweep_covers_every_grid_point() {
        let data = load_synthetic(11, 300);
        let opt = Optimizer::new(SimulationConfig::default(), FitnessMetric::TotalReturn)
            .with_parallelism(false);
        let outcome = opt.sweep(&data.series, &small_grid(), None, None).unwrap();
        assert_eq!(outcome.total, 18);
        assert_eq!(outcome.evaluated, 18);
        assert!(!outcome.cancelled);
        for p in small_grid().combinations() {
            assert!(outcome.surface.get(&p).is_some());
        }
    }

    #[test]
    fn failed_runs_are_recorded_not_fatal() {
        // 40 bars: slow 30 + signal 12 needs 42.
        let data = load_synthetic(11, 40);
        let grid = ParamGrid::new(
            PeriodRange::new(5, 5),
            PeriodRange::new(10, 30).with_step(20),
            PeriodRange::new(12, 12),
        );
        let opt = Optimizer::new(SimulationConfig::default(), FitnessMetric::TotalReturn)
            .with_parallelism(false);
        let outcome = opt.sweep(&data.series, &grid, None, None).unwrap();
        let failed = outcome.surface.get(&ParameterSet::new(5, 30, 12)).unwrap();
        assert_eq!(failed.error.as_deref(), Some("insufficient_data"));
        assert!(outcome.surface.get(&ParameterSet::new(5, 10, 12)).unwrap().error.is_none());
    }

    #[test]
    fn invalid_grid_is_rejected() {
        let data = load_synthetic(11, 100);
        let grid = ParamGrid::new(
            PeriodRange::new(0, 3),
            PeriodRange::new(8, 10),
            PeriodRange::new(3, 3),
        );
        let opt = Optimizer::new(SimulationConfig::default(), FitnessMetric::Sqn);
        assert!(matches!(
            opt.sweep(&data.series, &grid, None, None),
            Err(OptimizeError::InvalidGrid(_))
        ));
    }

    #[test]
    fn constraint_none_evaluates_inverted_periods_as_undefined() {
        let data = load_synthetic(11, 200);
        let grid = ParamGrid::new(
            PeriodRange::new(8, 8),
            PeriodRange::new(6, 8),
            PeriodRange::new(3, 3),
        )
        .with_constraint(Constraint::None);
        let opt = Optimizer::new(SimulationConfig::default(), FitnessMetric::Sqn)
            .with_parallelism(false);
        let outcome = opt.sweep(&data.series, &grid, None, None).unwrap();
        assert_eq!(outcome.evaluated, 3);
        assert_eq!(outcome.surface.viable_count(), 0);
        assert!(outcome
            .surface
            .iter()
            .all(|r| r.error.as_deref() == Some("invalid_parameter")));
    }
}
