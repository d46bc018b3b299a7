//! Price provider trait and structured error types.
//!
//! `PriceProvider` abstracts over where bars come from (CSV files, Yahoo
//! Finance, the synthetic generator) so callers see one explicit
//! `Result<_, FetchError>` boundary instead of silently-empty series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Errors from reading, validating or storing price data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("more than one timestamp column: {0}")]
    AmbiguousColumn(String),

    #[error("no usable rows in {0}")]
    NoData(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("no cached data for symbol '{symbol}'")]
    NoCachedData { symbol: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors at the fetch boundary.
///
/// Designed to be displayable in CLI output; a batch caller logs the error
/// and moves on to the next symbol.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("provider returned no bars for '{symbol}' between {start} and {end}")]
    Empty {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("fetch error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Cache,
    Synthetic,
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

/// Trait for price providers.
///
/// Implementations return bars already in ingestion shape: sorted,
/// de-duplicated, NaN-free. The cache layer sits above this trait.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a symbol whose date falls in `[start, end]`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, FetchError>;

    /// Whether the provider is currently willing to serve requests.
    fn is_available(&self) -> bool {
        true
    }
}

/// Keep bars whose date is in `[start, end]`.
pub(crate) fn clip_to_range(bars: Vec<Bar>, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| {
            let d = b.date();
            d >= start && d <= end
        })
        .collect()
}
