//! Hold-out validation — optimize on bars before a split date, then trade
//! the winning parameters on the bars from the split date on.
//!
//! The out-of-sample run starts from a fresh account and a cold indicator,
//! so its first `warmup_bars` bars can never trade.

use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::{ParameterSet, PriceSeries};
use macdlab_core::CoreError;

use crate::grid::ParamGrid;
use crate::optimizer::{OptimizeError, Optimizer};
use crate::runner::{run_backtest, BacktestResult};
use crate::surface::{RunResult, SurfaceError};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no bars before split date {0}")]
    EmptyTrain(NaiveDate),
    #[error("no bars on or after split date {0}")]
    EmptyTest(NaiveDate),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
    #[error("training sweep: {0}")]
    Surface(#[from] SurfaceError),
    #[error("validation run failed: {0}")]
    Run(#[from] CoreError),
    /// The training sweep was cancelled, so its best point is not the
    /// grid's best.
    #[error("training sweep cancelled after {evaluated} of {total} runs")]
    Cancelled { evaluated: usize, total: usize },
}

/// In-sample and out-of-sample results for one split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutReport {
    pub split_date: NaiveDate,
    pub train_bars: usize,
    pub test_bars: usize,
    pub best: RunResult,
    pub in_sample: BacktestResult,
    pub out_of_sample: BacktestResult,
    /// Grid points evaluated on the training part.
    pub evaluated: usize,
    pub viable: usize,
}

impl HoldoutReport {
    pub fn params(&self) -> ParameterSet {
        self.best.params
    }

    /// Out-of-sample total return minus in-sample total return.
    pub fn return_degradation(&self) -> f64 {
        self.out_of_sample.metrics.total_return - self.in_sample.metrics.total_return
    }
}

/// Split `series` at `split_date`, optimize on the training part and replay
/// the winner on the test part.
pub fn holdout_validate(
    series: &PriceSeries,
    split_date: NaiveDate,
    grid: &ParamGrid,
    optimizer: &Optimizer,
    cancel: Option<&AtomicBool>,
) -> Result<HoldoutReport, ValidationError> {
    let (train, test) = series.split_at_date(split_date);
    if train.is_empty() {
        return Err(ValidationError::EmptyTrain(split_date));
    }
    if test.is_empty() {
        return Err(ValidationError::EmptyTest(split_date));
    }
    tracing::info!(
        %split_date,
        train_bars = train.len(),
        test_bars = test.len(),
        "hold-out validation"
    );

    let outcome = optimizer.sweep(&train, grid, cancel, None)?;
    if outcome.cancelled {
        return Err(ValidationError::Cancelled {
            evaluated: outcome.evaluated,
            total: outcome.total,
        });
    }
    let best = outcome.best()?.clone();

    let in_sample = run_backtest(&train, best.params, optimizer.simulation())?;
    let out_of_sample = run_backtest(&test, best.params, optimizer.simulation())?;
    tracing::info!(
        params = %best.params,
        in_sample_return = in_sample.metrics.total_return,
        out_of_sample_return = out_of_sample.metrics.total_return,
        "hold-out complete"
    );

    Ok(HoldoutReport {
        split_date,
        train_bars: train.len(),
        test_bars: test.len(),
        best,
        in_sample,
        out_of_sample,
        evaluated: outcome.evaluated,
        viable: outcome.surface.viable_count(),
    })
}
