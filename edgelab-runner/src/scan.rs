//! Multi-symbol watchlist scan and end-of-day evaluation.
//!
//! Symbols are independent, so both passes fan out over rayon. A symbol
//! that cannot be fetched or planned is reported in `failures` and never
//! aborts the batch.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use edgelab_core::data::PriceProvider;
use edgelab_core::domain::{AssetClass, TradeIdea};
use edgelab_core::evaluator::{entry_triggered, evaluate_idea, IdeaEvaluation, SameBarPolicy};
use edgelab_core::watchlist::{plan_idea, Watchlist, CRYPTO_TICKERS};

use crate::config::WatchlistConfig;

/// Calendar days of history fetched per symbol for planning.
pub const SCAN_LOOKBACK_DAYS: i64 = 365;

/// Calendar days fetched to find the evaluation day's bar.
pub const EVAL_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub watchlist: Watchlist,
    pub failures: Vec<SymbolFailure>,
}

/// `-USD` pairs and the fixed crypto list are crypto; everything else equity.
pub fn asset_class_for(symbol: &str) -> AssetClass {
    if CRYPTO_TICKERS.contains(&symbol) || symbol.ends_with("-USD") {
        AssetClass::Crypto
    } else {
        AssetClass::Equity
    }
}

/// Configured symbols, then the crypto list if enabled; first occurrence wins.
pub fn scan_universe(cfg: &WatchlistConfig) -> Vec<String> {
    let crypto = CRYPTO_TICKERS
        .iter()
        .filter(|_| cfg.include_crypto)
        .map(|s| s.to_string());
    let mut out: Vec<String> = Vec::new();
    for s in cfg.symbols.iter().map(|s| s.trim().to_uppercase()).chain(crypto) {
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

/// Plan one idea per symbol from bars ending at `asof`.
pub fn scan_watchlist(
    symbols: &[String],
    provider: &dyn PriceProvider,
    asof: NaiveDate,
    risk_dollars: f64,
) -> ScanReport {
    let start = asof - Duration::days(SCAN_LOOKBACK_DAYS);
    let results: Vec<Result<TradeIdea, SymbolFailure>> = symbols
        .par_iter()
        .map(|symbol| {
            let fail = |reason: String| SymbolFailure {
                symbol: symbol.clone(),
                reason,
            };
            let fetched = provider
                .fetch(symbol, start, asof)
                .map_err(|e| fail(e.to_string()))?;
            plan_idea(symbol, asset_class_for(symbol), &fetched.bars, risk_dollars)
                .map_err(|e| fail(e.to_string()))
        })
        .collect();

    let mut ideas = Vec::new();
    let mut failures = Vec::new();
    for r in results {
        match r {
            Ok(idea) => ideas.push(idea),
            Err(f) => {
                warn!(symbol = %f.symbol, reason = %f.reason, "skipping symbol");
                failures.push(f);
            }
        }
    }
    info!(ideas = ideas.len(), failed = failures.len(), "watchlist scan complete");

    ScanReport {
        watchlist: Watchlist::new(ideas),
        failures,
    }
}

/// Score every idea against its latest bar on or before `day`.
///
/// A failed fetch scores as `no_data` for that idea.
pub fn evaluate_watchlist(
    watchlist: &Watchlist,
    provider: &dyn PriceProvider,
    day: NaiveDate,
    policy: SameBarPolicy,
) -> Vec<IdeaEvaluation> {
    let start = day - Duration::days(EVAL_LOOKBACK_DAYS);
    watchlist
        .ideas
        .par_iter()
        .map(|idea| {
            let bar = match provider.fetch(&idea.symbol, start, day) {
                Ok(fetched) => fetched.bars.last().cloned(),
                Err(e) => {
                    warn!(symbol = %idea.symbol, error = %e, "no bar for evaluation");
                    None
                }
            };
            evaluate_idea(idea, bar.as_ref(), policy)
        })
        .collect()
}

/// Latest price of one idea against its buffered entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerStatus {
    pub symbol: String,
    pub entry: f64,
    pub last: Option<f64>,
    pub triggered: bool,
}

/// Check every idea's latest close against `entry * (1 + buffer_bps/1e4)`.
pub fn check_triggers(
    watchlist: &Watchlist,
    provider: &dyn PriceProvider,
    asof: NaiveDate,
    buffer_bps: f64,
) -> Vec<TriggerStatus> {
    let start = asof - Duration::days(EVAL_LOOKBACK_DAYS);
    watchlist
        .ideas
        .par_iter()
        .map(|idea| {
            let last = provider
                .fetch(&idea.symbol, start, asof)
                .ok()
                .and_then(|f| f.bars.last().map(|b| b.close));
            TriggerStatus {
                symbol: idea.symbol.clone(),
                entry: idea.entry,
                last,
                triggered: last.is_some_and(|px| entry_triggered(idea.entry, px, buffer_bps)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgelab_core::data::SyntheticProvider;
    use edgelab_core::evaluator::{Outcome, DEFAULT_BUFFER_BPS};

    #[test]
    fn crypto_detection() {
        assert_eq!(asset_class_for("BTC-USD"), AssetClass::Crypto);
        assert_eq!(asset_class_for("ADA-USD"), AssetClass::Crypto);
        assert_eq!(asset_class_for("AAPL"), AssetClass::Equity);
    }

    #[test]
    fn universe_dedupes_and_appends_crypto() {
        let cfg = WatchlistConfig {
            symbols: vec!["aapl".into(), "MSFT".into(), "AAPL".into(), "BTC-USD".into()],
            ..WatchlistConfig::default()
        };
        let u = scan_universe(&cfg);
        assert_eq!(&u[..3], &["AAPL", "MSFT", "BTC-USD"]);
        assert_eq!(u.len(), 3 + CRYPTO_TICKERS.len() - 1);

        let no_crypto = WatchlistConfig {
            include_crypto: false,
            ..cfg
        };
        assert_eq!(scan_universe(&no_crypto), vec!["AAPL", "MSFT", "BTC-USD"]);
    }

    #[test]
    fn scan_reports_failures_without_aborting() {
        let asof = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let symbols = vec!["AAA".to_string(), "BBB".to_string()];
        let report = scan_watchlist(&symbols, &SyntheticProvider, asof, 10.0);
        assert_eq!(report.watchlist.ideas.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(report.watchlist.ideas[0].symbol, "AAA");

        // a window too short for RSI/ATR fails per symbol
        let tiny = scan_watchlist(&symbols, &ShortProvider, asof, 10.0);
        assert!(tiny.watchlist.ideas.is_empty());
        assert_eq!(tiny.failures.len(), 2);
    }

    #[test]
    fn evaluation_keeps_watchlist_order() {
        let asof = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let symbols = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let wl = scan_watchlist(&symbols, &SyntheticProvider, asof, 10.0).watchlist;

        let evals = evaluate_watchlist(&wl, &SyntheticProvider, asof, SameBarPolicy::default());
        let names: Vec<&str> = evals.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, vec!["AAA", "BBB", "CCC"]);
        assert!(evals.iter().all(|e| e.result != Outcome::NoData));
    }

    fn idea(symbol: &str, entry: f64) -> TradeIdea {
        TradeIdea {
            symbol: symbol.into(),
            asset_class: AssetClass::Equity,
            entry,
            stop: entry * 0.9,
            target: entry * 1.2,
            units: 1,
            rsi: 50.0,
            atr: 1.0,
        }
    }

    #[test]
    fn trigger_check_uses_buffer() {
        let asof = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let wl = Watchlist::new(vec![idea("AAA", 1.0), idea("BBB", 1.0e6)]);

        let status = check_triggers(&wl, &SyntheticProvider, asof, DEFAULT_BUFFER_BPS);
        assert_eq!(status.len(), 2);
        assert!(status[0].triggered);
        assert!(!status[1].triggered);
        assert!(status.iter().all(|s| s.last.is_some()));

        // a buffer large enough pushes the trigger out of reach
        let wide = check_triggers(&wl, &SyntheticProvider, asof, 1.0e9);
        assert!(!wide[0].triggered);

        let missing = check_triggers(&wl, &FailingProvider, asof, 0.0);
        assert_eq!(missing[0].last, None);
        assert!(!missing[0].triggered);
    }

    struct FailingProvider;

    impl PriceProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<edgelab_core::data::FetchResult, edgelab_core::data::FetchError> {
            Err(edgelab_core::data::FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
        }
    }

    struct ShortProvider;

    impl PriceProvider for ShortProvider {
        fn name(&self) -> &str {
            "short"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            end: NaiveDate,
        ) -> Result<edgelab_core::data::FetchResult, edgelab_core::data::FetchError> {
            SyntheticProvider.fetch(symbol, end - Duration::days(7), end)
        }
    }
}
