//! Daily watchlist planner.
//!
//! Turns the latest bar with defined RSI(14) and ATR(14) into a long trade
//! idea: entry at the close, stop 1.5 ATR below, target 3 ATR above, sized
//! so the entry-to-stop distance risks a fixed dollar amount.

use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AssetClass, Bar, TradeIdea};
use crate::indicators::{Atr, Indicator, Rsi};
use crate::signal::round_to;

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const STOP_ATR_MULT: f64 = 1.5;
pub const TARGET_ATR_MULT: f64 = 3.0;
pub const DEFAULT_RISK_DOLLARS: f64 = 10.0;

/// Crypto pairs always scanned alongside equities.
pub const CRYPTO_TICKERS: [&str; 5] = ["BTC-USD", "ETH-USD", "DOGE-USD", "SOL-USD", "XRP-USD"];

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{symbol}: no bar with both RSI and ATR defined ({bars} bars)")]
    InsufficientData { symbol: String, bars: usize },

    #[error("watchlist I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("watchlist json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Plan one idea from a symbol's bars (ascending time order).
pub fn plan_idea(
    symbol: &str,
    asset_class: AssetClass,
    bars: &[Bar],
    risk_dollars: f64,
) -> Result<TradeIdea, PlanError> {
    let rsi = Rsi::new(RSI_PERIOD).compute(bars);
    let atr = Atr::new(ATR_PERIOD).compute(bars);

    let last = (0..bars.len())
        .rev()
        .find(|&i| rsi[i].is_finite() && atr[i].is_finite() && !bars[i].is_void())
        .ok_or_else(|| PlanError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
        })?;

    let price = bars[last].close;
    let atr = floor_atr(atr[last], price);

    let entry = price;
    let stop = entry - STOP_ATR_MULT * atr;
    let target = entry + TARGET_ATR_MULT * atr;
    let per_unit = (entry - stop).max(1e-6);
    let units = (risk_dollars / per_unit).floor().max(0.0) as u64;

    let dp = if price < 1.0 { 5 } else { 2 };
    Ok(TradeIdea {
        symbol: symbol.to_string(),
        asset_class,
        entry: round_to(entry, dp),
        stop: round_to(stop, dp),
        target: round_to(target, dp),
        units,
        rsi: round_to(rsi[last], 2),
        atr: round_to(atr, dp),
    })
}

/// Keep stops from collapsing onto the entry on very quiet series.
fn floor_atr(atr: f64, price: f64) -> f64 {
    if price <= 1.0 {
        atr.max((0.01 * price).max(0.001))
    } else {
        atr.max(0.0025 * price)
    }
}

/// Persisted watchlist document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchlist {
    pub generated_at_utc: String,
    pub ideas: Vec<TradeIdea>,
}

impl Watchlist {
    pub fn new(ideas: Vec<TradeIdea>) -> Self {
        Self {
            generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            ideas,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ramp(n: usize, start: f64, step: f64, range: f64) -> Vec<Bar> {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                // alternate up/down moves so RSI is defined
                let close = start + step * i as f64 - if i % 2 == 0 { 0.0 } else { 1.5 * step };
                Bar {
                    timestamp: t0 + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + range / 2.0,
                    low: close - range / 2.0,
                    close,
                    volume: 1.0,
                }
            })
            .collect()
    }

    #[test]
    fn plan_uses_last_close_and_atr_multiples() {
        let bars = ramp(40, 100.0, 1.0, 2.0);
        let idea = plan_idea("SPY", AssetClass::Equity, &bars, 10.0).unwrap();

        let entry = bars.last().unwrap().close;
        assert_eq!(idea.entry, round_to(entry, 2));
        let atr = idea.atr;
        assert!((idea.stop - (entry - 1.5 * atr)).abs() < 0.02);
        assert!((idea.target - (entry + 3.0 * atr)).abs() < 0.03);
        assert!((idea.reward_risk() - 2.0).abs() < 0.02);
        assert_eq!(idea.units, (10.0 / (1.5 * atr)).floor() as u64);
        assert!(idea.rsi > 0.0 && idea.rsi < 100.0);
    }

    #[test]
    fn quiet_series_hits_atr_floor() {
        let bars = ramp(30, 200.0, 0.001, 0.0);
        let idea = plan_idea("QUIET", AssetClass::Equity, &bars, 10.0).unwrap();
        // floor = 0.25% of price
        assert!((idea.atr - round_to(0.0025 * bars[29].close, 2)).abs() < 1e-9);
    }

    #[test]
    fn sub_dollar_prices_use_five_decimals() {
        let bars = ramp(30, 0.05, 0.0001, 0.0);
        let idea = plan_idea("DOGE-USD", AssetClass::Crypto, &bars, 10.0).unwrap();
        // floor = max(1% of price, 0.001)
        assert!((idea.atr - 0.001).abs() < 1e-9);
        assert_eq!(idea.entry, round_to(bars[29].close, 5));
        assert_eq!(idea.units, (10.0f64 / 0.0015).floor() as u64);
    }

    #[test]
    fn short_history_is_insufficient() {
        let bars = ramp(10, 100.0, 1.0, 2.0);
        assert!(matches!(
            plan_idea("NEW", AssetClass::Equity, &bars, 10.0),
            Err(PlanError::InsufficientData { bars: 10, .. })
        ));
    }

    #[test]
    fn watchlist_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_watchlist.json");
        let idea = plan_idea("SPY", AssetClass::Equity, &ramp(40, 100.0, 1.0, 2.0), 10.0).unwrap();
        let wl = Watchlist::new(vec![idea]);
        wl.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"asset\": \"equity\""));
        assert_eq!(Watchlist::load(&path).unwrap(), wl);
    }
}
