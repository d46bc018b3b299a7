//! Bar loading and data resolution for the runner.
//!
//! Resolves the bars for one symbol with a fixed fallback policy:
//! 1. Cached data that covers the requested range → use it
//! 2. Otherwise, when online and a provider is available → fetch and cache
//! 3. If that fails and `synthetic` is set → generate a seeded random walk
//! 4. Otherwise → fail with a clear error
//!
//! The resolved series is written to the dataset's `prices.csv`, so every
//! later stage (backtest, advisor, closer) reads the same bars.

use chrono::{Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

use edgelab_core::data::{
    hash_bars, DataError, DataSource, DatasetStore, FetchError, PriceProvider, SyntheticProvider,
};
use edgelab_core::domain::Bar;

use crate::config::DataConfig;

/// Calendar days fetched when no start date is configured.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 730;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and no network access (set data.synthetic for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("synthetic generation failed: {0}")]
    Synthetic(#[source] FetchError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Skip the cache and fetch again.
    pub force: bool,
}

impl LoadOptions {
    /// Resolve open-ended dates against today.
    pub fn from_config(cfg: &DataConfig) -> Self {
        let end = cfg.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = cfg
            .start
            .unwrap_or_else(|| end - Duration::days(DEFAULT_LOOKBACK_DAYS));
        Self {
            start,
            end,
            offline: cfg.offline,
            synthetic: cfg.synthetic,
            force: false,
        }
    }
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over the bars, used for the run id.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load bars for `symbol` into `store`, with fallback to download or synthetic.
pub fn load_bars(
    symbol: &str,
    store: &DatasetStore,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let (bars, source) = resolve(symbol, store, provider, opts)?;
    store.save_prices(&bars)?;

    let dataset_hash = hash_bars(&bars);
    info!(
        symbol,
        bars = bars.len(),
        source = ?source,
        hash = &dataset_hash[..12],
        "loaded price data"
    );
    Ok(LoadedData {
        symbol: symbol.to_string(),
        bars,
        source,
        dataset_hash,
        has_synthetic: source == DataSource::Synthetic,
    })
}

fn resolve(
    symbol: &str,
    store: &DatasetStore,
    provider: Option<&dyn PriceProvider>,
    opts: &LoadOptions,
) -> Result<(Vec<Bar>, DataSource), LoadError> {
    let cache = store.cache();

    // Step 1: cache
    if !opts.force && cache.covers_range(symbol, opts.start, opts.end) {
        match cache.load(symbol) {
            Ok(bars) => {
                let bars = clip(bars, opts.start, opts.end);
                if !bars.is_empty() {
                    return Ok((bars, DataSource::Cache));
                }
            }
            Err(e) => warn!(symbol, error = %e, "cache load failed, refetching"),
        }
    }

    // Step 2: provider
    let mut failure = String::from("no provider configured");
    if !opts.offline {
        if let Some(prov) = provider.filter(|p| p.is_available()) {
            match prov.fetch(symbol, opts.start, opts.end) {
                Ok(fetched) => {
                    cache.write(symbol, &fetched.bars, fetched.source)?;
                    return Ok((fetched.bars, fetched.source));
                }
                Err(e) => {
                    warn!(symbol, provider = prov.name(), error = %e, "fetch failed");
                    failure = e.to_string();
                }
            }
        }
    }

    // Step 3: synthetic
    if opts.synthetic {
        warn!(symbol, "generating synthetic data; results are tagged as synthetic");
        let fetched = SyntheticProvider
            .fetch(symbol, opts.start, opts.end)
            .map_err(LoadError::Synthetic)?;
        return Ok((fetched.bars, DataSource::Synthetic));
    }

    // Step 4: fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason: failure,
    })
}

fn clip(bars: Vec<Bar>, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| (start..=end).contains(&b.date()))
        .collect()
}
