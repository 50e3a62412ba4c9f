//! Price loading for the runner.
//!
//! Two sources:
//! 1. CSV file with a `date` column, a close column (`close`, or `adj close`
//!    / `adj_close` as a fallback) and an optional `open` column. Header
//!    names are matched case-insensitively. Rows are sorted by date;
//!    duplicates are left for the series constructor to reject.
//! 2. Synthetic seeded random walk (`--synthetic`), for development only.
//!    Results produced on synthetic data are tagged.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use macdlab_core::domain::{Bar, PriceSeries};
use macdlab_core::CoreError;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("row {row}: cannot parse date '{value}'")]
    BadDate { row: usize, value: String },
    #[error("row {row}: cannot parse {column} '{value}'")]
    BadPrice {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("no rows in price data")]
    Empty,
    #[error(transparent)]
    Series(#[from] CoreError),
}

/// Where a series came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: String },
    Synthetic { seed: u64 },
}

/// A loaded series plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: PriceSeries,
    pub source: DataSource,
    /// BLAKE3 fingerprint of the series.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedData {
    fn new(series: PriceSeries, source: DataSource) -> Self {
        let has_synthetic = matches!(source, DataSource::Synthetic { .. });
        Self {
            dataset_hash: series.fingerprint(),
            series,
            source,
            has_synthetic,
        }
    }

    /// Restrict to bars in `[start, end]` (either bound optional).
    pub fn restrict(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if start.is_none() && end.is_none() {
            return self;
        }
        let lo = start.unwrap_or(NaiveDate::MIN);
        let hi = end.unwrap_or(NaiveDate::MAX);
        Self::new(self.series.between(lo, hi), self.source)
    }
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Load a price CSV file.
pub fn load_csv(path: &Path) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let series = parse_csv(file)?;
    tracing::info!(
        path = %path.display(),
        bars = series.len(),
        "loaded price data"
    );
    Ok(LoadedData::new(
        series,
        DataSource::Csv {
            path: path.display().to_string(),
        },
    ))
}

/// Parse price CSV from any reader.
pub fn parse_csv<R: Read>(reader: R) -> Result<PriceSeries, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    let find = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| headers.iter().position(|h| h == n))
    };

    let date_col = find(&["date", "timestamp", "datetime"]).ok_or(LoadError::MissingColumn("date"))?;
    let close_col = find(&["close", "adj close", "adj_close"]).ok_or(LoadError::MissingColumn("close"))?;
    let open_col = find(&["open"]);

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |col: usize| record.get(col).unwrap_or("");

        let date = parse_date(field(date_col)).ok_or_else(|| LoadError::BadDate {
            row,
            value: field(date_col).to_string(),
        })?;
        let close = parse_price(field(close_col)).ok_or_else(|| LoadError::BadPrice {
            row,
            column: "close",
            value: field(close_col).to_string(),
        })?;
        let open = match open_col {
            Some(col) => parse_price(field(col)).ok_or_else(|| LoadError::BadPrice {
                row,
                column: "open",
                value: field(col).to_string(),
            })?,
            None => close,
        };
        bars.push(Bar::new(date, open, close));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    bars.sort_by_key(|b| b.date);
    Ok(PriceSeries::new(bars)?)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_price(value: &str) -> Option<f64> {
    value.parse::<f64>().ok()
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// First date of synthetic series.
pub fn synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2011, 1, 3).unwrap_or(NaiveDate::MIN)
}

/// Generate a seeded random-walk series of `bars` weekdays.
///
/// Deterministic in `seed`: the RNG is seeded from a BLAKE3 hash of it.
/// Each bar opens at the previous close and moves up to ±3%.
pub fn synthetic_series(seed: u64, bars: usize, start: NaiveDate) -> PriceSeries {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed_bytes = blake3::hash(format!("macdlab-synthetic-{seed}").as_bytes());
    let mut rng = StdRng::from_seed(*seed_bytes.as_bytes());

    let mut out = Vec::with_capacity(bars);
    let mut price = 100.0_f64;
    let mut current = start;
    while out.len() < bars {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::days(1);
            continue;
        }
        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        out.push(Bar::new(current, open, close));
        price = close;
        current += Duration::days(1);
    }
    // Dates strictly increase by construction.
    PriceSeries::new(out).unwrap_or_default()
}

/// Synthetic series wrapped with provenance.
pub fn load_synthetic(seed: u64, bars: usize) -> LoadedData {
    tracing::warn!(seed, bars, "generating synthetic price data; results are tagged synthetic");
    LoadedData::new(
        synthetic_series(seed, bars, synthetic_start()),
        DataSource::Synthetic { seed },
    )
}
