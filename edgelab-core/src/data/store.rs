//! Dataset handle: one root directory owning every artifact of a dataset.
//!
//! Callers construct a `DatasetStore` and pass it around instead of relying
//! on fixed global paths.

use std::fs;
use std::path::{Path, PathBuf};

use super::cache::ParquetCache;
use super::ingest::read_price_csv;
use super::provider::DataError;
use crate::domain::Bar;

pub const PRICES_FILE: &str = "prices.csv";
pub const BACKTEST_RESULTS_FILE: &str = "backtest_results.csv";
pub const MANIFEST_FILE: &str = "backtest_manifest.json";
pub const TRADES_LOG_FILE: &str = "trades_log.csv";
pub const SIGNALS_LOG_FILE: &str = "signals_log.csv";
pub const WATCHLIST_FILE: &str = "daily_watchlist.json";
pub const EVAL_LOG_FILE: &str = "eval_log.csv";
const CACHE_DIR: &str = "cache";

#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed.
    pub fn ensure(&self) -> Result<(), DataError> {
        fs::create_dir_all(&self.root).map_err(|e| DataError::io(&self.root, e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prices_path(&self) -> PathBuf {
        self.root.join(PRICES_FILE)
    }

    pub fn backtest_results_path(&self) -> PathBuf {
        self.root.join(BACKTEST_RESULTS_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn trades_log_path(&self) -> PathBuf {
        self.root.join(TRADES_LOG_FILE)
    }

    pub fn signals_log_path(&self) -> PathBuf {
        self.root.join(SIGNALS_LOG_FILE)
    }

    pub fn watchlist_path(&self) -> PathBuf {
        self.root.join(WATCHLIST_FILE)
    }

    pub fn eval_log_path(&self) -> PathBuf {
        self.root.join(EVAL_LOG_FILE)
    }

    /// Per-symbol Parquet cache under `{root}/cache`.
    pub fn cache(&self) -> ParquetCache {
        ParquetCache::new(self.root.join(CACHE_DIR))
    }

    /// Read and validate `prices.csv`.
    pub fn load_prices(&self) -> Result<Vec<Bar>, DataError> {
        read_price_csv(&self.prices_path())
    }

    /// Write bars as `prices.csv` (full overwrite).
    pub fn save_prices(&self, bars: &[Bar]) -> Result<(), DataError> {
        self.ensure()?;
        write_price_csv(&self.prices_path(), bars)
    }
}

/// Write bars in the canonical price CSV layout.
pub fn write_price_csv(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| DataError::Csv(e.to_string()))?;
    let csv_err = |e: csv::Error| DataError::Csv(format!("{}: {e}", path.display()));
    wtr.write_record(["datetime", "open", "high", "low", "close", "volume"])
        .map_err(csv_err)?;
    for b in bars {
        wtr.write_record([
            b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|e| DataError::io(path, e))
}
