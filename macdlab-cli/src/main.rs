//! MacdLab CLI — single runs, grid optimization and hold-out validation.
//!
//! Commands:
//! - `run` — backtest one MACD parameter set and write its artifacts
//! - `optimize` — sweep the parameter grid and write the surface
//! - `validate` — optimize before a split date, trade the winner after it
//!
//! Price data comes from `--data prices.csv` or, with `--synthetic`, from a
//! seeded random walk. Logs go to stderr; summaries go to stdout.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use macdlab_core::engine::TradeTiming;
use macdlab_runner::export::{format_summary, save_run_artifacts, save_sweep_artifacts};
use macdlab_runner::{
    holdout_validate, load_csv, load_synthetic, run_single_backtest, FitnessMetric, LoadedData,
    MacdLabConfig, Optimizer, RunResult, SweepReport,
};

#[derive(Parser)]
#[command(
    name = "macdlab",
    about = "MacdLab CLI — MACD crossover backtesting and grid optimization"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Price CSV with `date` and `close` columns (optional `open`).
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Use a seeded synthetic random walk instead of a CSV file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for synthetic data.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of synthetic bars.
    #[arg(long, default_value_t = 2520)]
    bars: usize,

    /// First date to keep (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,

    /// TOML config file. Missing sections use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one parameter set.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Fast EMA period (overrides config).
        #[arg(long)]
        fast: Option<usize>,

        /// Slow EMA period (overrides config).
        #[arg(long)]
        slow: Option<usize>,

        /// Signal EMA period (overrides config).
        #[arg(long)]
        signal: Option<usize>,

        /// Starting cash (overrides config).
        #[arg(long)]
        cash: Option<f64>,

        /// Fill at the signal bar's close instead of the next open.
        #[arg(long, default_value_t = false)]
        on_close: bool,

        /// Output directory for result.json, trades.csv, equity.csv.
        #[arg(long, default_value = "results/run")]
        out: PathBuf,
    },
    /// Sweep the (fast, slow, signal) grid.
    Optimize {
        #[command(flatten)]
        data: DataArgs,

        /// Fitness metric: sqn, sharpe, total_return, win_rate, profit_factor, calmar.
        #[arg(long)]
        metric: Option<FitnessMetric>,

        /// Ranked results to print and report.
        #[arg(long)]
        top: Option<usize>,

        /// Worker threads (0 = one per core).
        #[arg(long)]
        threads: Option<usize>,

        /// Evaluate grid points one at a time in grid order.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Output directory for surface.csv, heatmap_fast_slow.csv, sweep.json.
        #[arg(long, default_value = "results/optimize")]
        out: PathBuf,
    },
    /// Optimize on bars before a split date, trade the winner after it.
    Validate {
        #[command(flatten)]
        data: DataArgs,

        /// Split date (YYYY-MM-DD). Defaults to `validation.split_date`.
        #[arg(long)]
        split: Option<NaiveDate>,

        /// Fitness metric (overrides config).
        #[arg(long)]
        metric: Option<FitnessMetric>,

        /// Output directory for holdout.json.
        #[arg(long, default_value = "results/validate")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command {
        Commands::Run {
            data,
            fast,
            slow,
            signal,
            cash,
            on_close,
            out,
        } => run_cmd(&data, fast, slow, signal, cash, on_close, &out),
        Commands::Optimize {
            data,
            metric,
            top,
            threads,
            sequential,
            out,
        } => optimize_cmd(&data, metric, top, threads, sequential, &out),
        Commands::Validate {
            data,
            split,
            metric,
            out,
        } => validate_cmd(&data, split, metric, &out),
    }
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

// ─── Shared setup ───────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<MacdLabConfig> {
    match path {
        Some(p) => MacdLabConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(MacdLabConfig::default()),
    }
}

fn load_data(args: &DataArgs) -> Result<LoadedData> {
    let data = match (&args.data, args.synthetic) {
        (Some(path), _) => {
            load_csv(path).with_context(|| format!("failed to load {}", path.display()))?
        }
        (None, true) => load_synthetic(args.seed, args.bars),
        (None, false) => bail!("no price data: pass --data <csv> or --synthetic"),
    };
    let data = data.restrict(args.start, args.end);
    if data.series.is_empty() {
        bail!("no bars left after applying --start/--end");
    }
    Ok(data)
}

fn print_ranked(results: &[&RunResult]) {
    println!(
        "{:>4} {:>5} {:>5} {:>6} {:>12} {:>14} {:>7}",
        "rank", "fast", "slow", "signal", "fitness", "final_equity", "trades"
    );
    for (i, r) in results.iter().enumerate() {
        println!(
            "{:>4} {:>5} {:>5} {:>6} {:>12.4} {:>14.2} {:>7}",
            i + 1,
            r.params.fast_period,
            r.params.slow_period,
            r.params.signal_period,
            r.fitness.unwrap_or(f64::NAN),
            r.final_equity.unwrap_or(f64::NAN),
            r.trade_count,
        );
    }
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_cmd(
    args: &DataArgs,
    fast: Option<usize>,
    slow: Option<usize>,
    signal: Option<usize>,
    cash: Option<f64>,
    on_close: bool,
    out: &Path,
) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(v) = fast {
        config.strategy.fast_period = v;
    }
    if let Some(v) = slow {
        config.strategy.slow_period = v;
    }
    if let Some(v) = signal {
        config.strategy.signal_period = v;
    }
    if let Some(v) = cash {
        config.backtest.initial_cash = v;
    }
    if on_close {
        config.backtest.trade_timing = TradeTiming::OnClose;
    }

    let data = load_data(args)?;
    let result = run_single_backtest(&config, &data).context("backtest failed")?;
    print!("{}", format_summary(&result));

    let dir = save_run_artifacts(&result, out)?;
    println!("Artifacts:     {}", dir.display());
    Ok(())
}

fn optimize_cmd(
    args: &DataArgs,
    metric: Option<FitnessMetric>,
    top: Option<usize>,
    threads: Option<usize>,
    sequential: bool,
    out: &Path,
) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(m) = metric {
        config.optimizer.fitness = m;
    }
    if let Some(n) = top {
        config.optimizer.top_n = n;
    }
    if let Some(t) = threads {
        config.optimizer.threads = t;
    }
    if sequential {
        config.optimizer.parallel = false;
    }
    config.validate()?;

    let data = load_data(args)?;
    let optimizer = Optimizer::from_config(&config);

    let step = (config.grid.size() / 10).max(1);
    let last_logged = AtomicUsize::new(0);
    let progress = |done: usize, total: usize| {
        if claim_progress_step(&last_logged, done, total, step) {
            tracing::info!(done, total, "sweep progress");
        }
    };
    let outcome = optimizer
        .sweep(&data.series, &config.grid, None, Some(&progress))
        .context("sweep failed")?;

    let report = SweepReport::from_outcome(
        &outcome,
        config.optimizer.top_n,
        &data.dataset_hash,
        &config.config_hash()?,
    );
    let dir = save_sweep_artifacts(&outcome.surface, &report, out)?;

    println!(
        "Evaluated {} of {} grid points ({} viable), metric {}",
        outcome.evaluated,
        outcome.total,
        outcome.surface.viable_count(),
        config.optimizer.fitness.name()
    );
    let best = outcome.best().context("optimization produced no result")?;
    println!("Best:          {}", best.params);
    print_ranked(&outcome.surface.top_n(config.optimizer.top_n));
    println!("Artifacts:     {}", dir.display());
    Ok(())
}

/// Returns true when `done` crosses the next logging step and this caller
/// won the race to record it. Completion is always reported.
fn claim_progress_step(last: &AtomicUsize, done: usize, total: usize, step: usize) -> bool {
    if done == total {
        return true;
    }
    let prev = last.load(Ordering::Relaxed);
    done >= prev + step
        && last
            .compare_exchange(prev, done, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
}

fn validate_cmd(
    args: &DataArgs,
    split: Option<NaiveDate>,
    metric: Option<FitnessMetric>,
    out: &Path,
) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(m) = metric {
        config.optimizer.fitness = m;
    }
    let Some(split_date) = split.or(config.validation.split_date) else {
        bail!("no split date: pass --split or set validation.split_date");
    };

    let data = load_data(args)?;
    let optimizer = Optimizer::from_config(&config);
    let report = holdout_validate(&data.series, split_date, &config.grid, &optimizer, None)
        .context("hold-out validation failed")?;

    println!(
        "Split {}: {} training bars, {} test bars",
        report.split_date, report.train_bars, report.test_bars
    );
    println!("Best on training data: {}", report.params());
    println!("── In sample ──");
    print!("{}", format_summary(&report.in_sample));
    println!("── Out of sample ──");
    print!("{}", format_summary(&report.out_of_sample));
    println!(
        "Return degradation: {:+.2}%",
        report.return_degradation() * 100.0
    );

    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    let path = out.join("holdout.json");
    let json = serde_json::to_string_pretty(&report).context("failed to serialize hold-out report")?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Report:        {}", path.display());
    Ok(())
}
