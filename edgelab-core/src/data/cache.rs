//! Parquet price cache.
//!
//! Layout: `{cache_dir}/{SYMBOL}.parquet` plus a `{SYMBOL}.meta.json`
//! sidecar (hash, date range, source).
//!
//! - Writes are atomic (write to .tmp, rename into place).
//! - Loads validate the typed schema and row count; a file that fails is
//!   renamed to `.quarantined` and reported as a cache miss.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::provider::{DataError, DataSource};
use super::schema::PriceSchema;
use crate::domain::Bar;

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
}

/// Weekend plus a holiday.
const EDGE_SLACK_DAYS: i64 = 3;

/// The Parquet cache.
#[derive(Debug, Clone)]
pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn data_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.meta.json"))
    }

    /// Write bars for a symbol, replacing anything cached before.
    pub fn write(&self, symbol: &str, bars: &[Bar], source: DataSource) -> Result<(), DataError> {
        let (first, last) = match (bars.first(), bars.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(DataError::Cache("no bars to cache".into())),
        };

        fs::create_dir_all(&self.cache_dir).map_err(|e| DataError::io(&self.cache_dir, e))?;

        let df = bars_to_dataframe(bars)?;
        let path = self.data_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first.date(),
            end_date: last.date(),
            bar_count: bars.len(),
            data_hash: hash_bars(bars),
            source,
            cached_at: chrono::Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Cache(format!("meta serialization: {e}")))?;
        let meta_path = self.meta_path(symbol);
        fs::write(&meta_path, meta_json).map_err(|e| DataError::io(&meta_path, e))?;

        Ok(())
    }

    /// Load all cached bars for a symbol, sorted by timestamp.
    pub fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.data_path(symbol);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        match load_and_validate_parquet(&path) {
            Ok(mut bars) => {
                bars.sort_by_key(|b| b.timestamp);
                Ok(bars)
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                let _ = fs::rename(&path, &quarantine);
                Err(DataError::NoCachedData {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    /// Metadata for a cached symbol, if any.
    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// True when cached data spans `[start, end]`, allowing a few
    /// non-trading days at either edge.
    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> bool {
        let slack = chrono::Duration::days(EDGE_SLACK_DAYS);
        self.get_meta(symbol)
            .map(|m| m.start_date <= start + slack && m.end_date + slack >= end)
            .unwrap_or(false)
    }
}

/// Deterministic BLAKE3 hash over timestamps and OHLCV values.
pub fn hash_bars(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, DataError> {
    let millis: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();
    let column = |name: &str, f: fn(&Bar) -> f64| {
        Column::new(name.into(), bars.iter().map(f).collect::<Vec<f64>>())
    };

    DataFrame::new(vec![
        Column::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| DataError::Parquet(format!("timestamp cast: {e}")))?,
        column("open", |b| b.open),
        column("high", |b| b.high),
        column("low", |b| b.low),
        column("close", |b| b.close),
        column("volume", |b| b.volume),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path).map_err(|e| DataError::io(path, e))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::Parquet("empty parquet file".into()));
    }
    PriceSchema::validate(&df)?;

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let read = |name: &str| -> Result<Vec<Option<f64>>, DataError> {
        let col = df
            .column(name)
            .map_err(|e| DataError::Parquet(format!("column read: {e}")))?;
        let ca = col
            .f64()
            .map_err(|e| DataError::Parquet(format!("{name} column type: {e}")))?;
        Ok(ca.into_iter().collect())
    };

    let millis = df
        .column("timestamp")
        .and_then(|c| c.cast(&DataType::Int64))
        .map_err(|e| DataError::Parquet(format!("timestamp column: {e}")))?;
    let millis = millis
        .i64()
        .map_err(|e| DataError::Parquet(format!("timestamp column type: {e}")))?;

    let opens = read("open")?;
    let highs = read("high")?;
    let lows = read("low")?;
    let closes = read("close")?;
    let volumes = read("volume")?;

    let mut bars = Vec::with_capacity(df.height());
    for (i, ms) in millis.into_iter().enumerate() {
        let timestamp = ms
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DataError::Parquet(format!("null timestamp at row {i}")))?;
        bars.push(Bar {
            timestamp,
            open: opens[i].unwrap_or(f64::NAN),
            high: highs[i].unwrap_or(f64::NAN),
            low: lows[i].unwrap_or(f64::NAN),
            close: closes[i].unwrap_or(f64::NAN),
            volume: volumes[i].unwrap_or(f64::NAN),
        });
    }

    Ok(bars.into_iter().filter(|b| !b.is_void()).collect())
}
