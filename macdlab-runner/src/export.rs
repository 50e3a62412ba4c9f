//! Artifact export — JSON results and CSV tables.
//!
//! - **JSON**: `BacktestResult` and `SweepReport`, schema versioned. Unknown
//!   versions are rejected on load.
//! - **CSV**: trade list, equity curve, the full optimization surface, and a
//!   2-D heatmap table.
//! - **Text**: a short plain-text summary for terminal output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use macdlab_core::domain::TradeRecord;
use macdlab_core::engine::EquityPoint;

use crate::optimizer::SweepReport;
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::surface::{Axis, OptimizationSurface, Reducer, Surface2D};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

pub fn export_sweep_json(report: &SweepReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SweepReport to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Columns: side, entry_bar, entry_date, entry_price, exit_bar, exit_date,
/// exit_price, size, pnl, return_pct, bars_held, forced_exit
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_bar",
        "entry_date",
        "entry_price",
        "exit_bar",
        "exit_date",
        "exit_price",
        "size",
        "pnl",
        "return_pct",
        "bars_held",
        "forced_exit",
    ])?;
    for t in trades {
        wtr.write_record([
            format!("{:?}", t.side),
            t.entry_bar.to_string(),
            t.entry_date.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            t.exit_date.to_string(),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.size),
            format!("{:.2}", t.pnl),
            format!("{:.6}", t.return_pct()),
            t.bars_held.to_string(),
            t.forced_exit.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Columns: bar_index, date, equity
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "date", "equity"])?;
    for (i, point) in equity_curve.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            point.date.to_string(),
            format!("{:.2}", point.equity),
        ])?;
    }
    finish_csv(wtr)
}

/// One row per evaluated grid point in parameter order. Undefined values
/// are empty cells.
///
/// Columns: fast, slow, signal, fitness, final_equity, total_return,
/// trade_count, error
pub fn export_surface_csv(surface: &OptimizationSurface) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "fast",
        "slow",
        "signal",
        "fitness",
        "final_equity",
        "total_return",
        "trade_count",
        "error",
    ])?;
    for r in surface.iter() {
        wtr.write_record([
            r.params.fast_period.to_string(),
            r.params.slow_period.to_string(),
            r.params.signal_period.to_string(),
            opt_cell(r.fitness),
            opt_cell(r.final_equity),
            opt_cell(r.total_return),
            r.trade_count.to_string(),
            r.error.clone().unwrap_or_default(),
        ])?;
    }
    finish_csv(wtr)
}

/// Heatmap table: first column is the row axis, one column per value of the
/// column axis. Absent cells are empty.
pub fn export_surface2d_csv(table: &Surface2D) -> Result<String> {
    let cols = table.cols();
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec![format!("{}\\{}", table.row_axis.name(), table.col_axis.name())];
    header.extend(cols.iter().map(|c| c.to_string()));
    wtr.write_record(&header)?;
    for row in table.rows() {
        let mut record = vec![row.to_string()];
        record.extend(cols.iter().map(|&c| opt_cell(table.get(row, c))));
        wtr.write_record(&record)?;
    }
    finish_csv(wtr)
}

// ─── Text summary ───────────────────────────────────────────────────

/// Plain-text summary of a single run.
pub fn format_summary(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let mut s = String::new();
    let _ = writeln!(s, "MACD {}", result.params);
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        let _ = writeln!(s, "Period:        {start} to {end} ({} bars)", result.bar_count);
    }
    if result.has_synthetic {
        let _ = writeln!(s, "Data:          SYNTHETIC");
    }
    let _ = writeln!(s, "Initial cash:  {:.2}", result.initial_cash);
    let _ = writeln!(s, "Final equity:  {:.2}", result.final_equity);
    let _ = writeln!(s, "Total return:  {:.2}%", m.total_return * 100.0);
    let _ = writeln!(s, "Buy & hold:    {:.2}%", m.buy_and_hold_return * 100.0);
    let _ = writeln!(s, "CAGR:          {:.2}%", m.cagr * 100.0);
    let _ = writeln!(s, "Sharpe:        {:.3}", m.sharpe);
    let _ = writeln!(s, "Max drawdown:  {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(s, "Trades:        {}", m.trade_count);
    let _ = writeln!(s, "Win rate:      {:.1}%", m.win_rate * 100.0);
    let _ = writeln!(s, "Exposure:      {:.1}%", m.exposure * 100.0);
    match m.sqn {
        Some(sqn) => {
            let _ = writeln!(s, "SQN:           {sqn:.3}");
        }
        None => {
            let _ = writeln!(s, "SQN:           n/a");
        }
    }
    if let Some(pos) = &result.open_position {
        let _ = writeln!(
            s,
            "Open position: {:?} {:.4} @ {:.4} since {}",
            pos.side, pos.size, pos.entry_price, pos.entry_date
        );
    }
    s
}

// ─── Artifact bundles ───────────────────────────────────────────────

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Write `result.json`, `trades.csv` and `equity.csv` under `output_dir`.
///
/// Returns the directory.
pub fn save_run_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;
    write_file(&output_dir.join("result.json"), &export_json(result)?)?;
    write_file(&output_dir.join("trades.csv"), &export_trades_csv(&result.trades)?)?;
    write_file(&output_dir.join("equity.csv"), &export_equity_csv(&result.equity_curve)?)?;
    Ok(output_dir.to_path_buf())
}

/// Load a `BacktestResult` from a directory's `result.json`.
pub fn load_run_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Write `surface.csv`, `heatmap_fast_slow.csv` (mean over signal period)
/// and `sweep.json` under `output_dir`.
pub fn save_sweep_artifacts(
    surface: &OptimizationSurface,
    report: &SweepReport,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;
    write_file(&output_dir.join("surface.csv"), &export_surface_csv(surface)?)?;
    let heatmap = surface.reduce(Axis::Signal, Reducer::Mean);
    write_file(
        &output_dir.join("heatmap_fast_slow.csv"),
        &export_surface2d_csv(&heatmap)?,
    )?;
    write_file(&output_dir.join("sweep.json"), &export_sweep_json(report)?)?;
    Ok(output_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::load_synthetic;
    use crate::fitness::FitnessMetric;
    use crate::runner::run_backtest;
    use crate::surface::RunResult;
    use macdlab_core::domain::ParameterSet;
    use macdlab_core::engine::SimulationConfig;

    fn sample_result() -> BacktestResult {
        let data = load_synthetic(21, 300);
        run_backtest(&data.series, ParameterSet::default(), &SimulationConfig::default()).unwrap()
    }

    fn assert_same_run(a: &BacktestResult, b: &BacktestResult) {
        assert_eq!(a.params, b.params);
        assert_eq!(a.trades.len(), b.trades.len());
        assert_eq!(a.equity_curve.len(), b.equity_curve.len());
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert!((a.final_equity - b.final_equity).abs() < 1e-6);
    }

    #[test]
    fn json_round_trip() {
        let r = sample_result();
        let back = import_json(&export_json(&r).unwrap()).unwrap();
        assert_same_run(&back, &r);
    }

    #[test]
    fn future_schema_is_rejected() {
        let mut r = sample_result();
        r.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&r).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn trades_csv_has_one_row_per_trade() {
        let r = sample_result();
        let csv = export_trades_csv(&r.trades).unwrap();
        assert_eq!(csv.lines().count(), r.trades.len() + 1);
        assert!(csv.starts_with("side,entry_bar,entry_date"));
    }

    #[test]
    fn equity_csv_has_one_row_per_bar() {
        let r = sample_result();
        let csv = export_equity_csv(&r.equity_curve).unwrap();
        assert_eq!(csv.lines().count(), 301);
    }

    #[test]
    fn surface_csv_leaves_undefined_cells_empty() {
        let mut surface = OptimizationSurface::new(FitnessMetric::Sqn);
        surface.insert(RunResult {
            params: ParameterSet::new(5, 10, 3),
            final_equity: Some(1_100.0),
            fitness: None,
            trade_count: 1,
            total_return: Some(0.1),
            error: None,
        });
        let csv = export_surface_csv(&surface).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "5,10,3,,1100.000000,0.100000,1,");
    }

    #[test]
    fn heatmap_csv_layout() {
        let mut surface = OptimizationSurface::new(FitnessMetric::Sqn);
        for (fast, slow, f) in [(5, 10, 1.0), (5, 12, 2.0), (6, 12, 3.0)] {
            surface.insert(RunResult {
                params: ParameterSet::new(fast, slow, 3),
                final_equity: Some(1.0),
                fitness: Some(f),
                trade_count: 2,
                total_return: Some(0.0),
                error: None,
            });
        }
        let csv = export_surface2d_csv(&surface.reduce(Axis::Signal, Reducer::Mean)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "fast\\slow,10,12");
        assert_eq!(lines[1], "5,1.000000,2.000000");
        assert_eq!(lines[2], "6,,3.000000");
    }

    #[test]
    fn run_artifacts_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let r = sample_result();
        let out = save_run_artifacts(&r, &dir.path().join("run")).unwrap();
        assert!(out.join("trades.csv").exists());
        assert!(out.join("equity.csv").exists());
        assert_same_run(&load_run_artifacts(&out).unwrap(), &r);
    }

    #[test]
    fn summary_mentions_params() {
        let r = sample_result();
        assert!(format_summary(&r).contains("fast=12 slow=26 signal=9"));
    }
}
