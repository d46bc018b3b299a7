//! Paper trade: one row of the trade journal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::parse_timestamp;
use super::forecast::Side;

/// Lifecycle state. `Open -> Closed` is the only transition and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    #[serde(alias = "open", alias = "Open")]
    Open,
    #[serde(alias = "closed", alias = "Closed")]
    Closed,
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    /// Target (take-profit) level touched.
    #[serde(alias = "tp")]
    Tp,
    /// Stop-loss level touched.
    #[serde(alias = "sl")]
    Sl,
    /// Holding window elapsed without touching either level.
    #[serde(alias = "time", alias = "Time")]
    Time,
}

/// A simulated position recorded in the journal.
///
/// `ts` is kept as the raw string written by whoever opened the trade, so a
/// malformed value never prevents the rest of the journal from loading; the
/// closer simply leaves such rows open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTrade {
    pub ts: String,
    pub ticker: String,
    pub side: Side,
    pub entry_spot: f64,
    pub tp_spot: f64,
    pub sl_spot: f64,
    pub shares: u64,
    pub contracts: u64,
    pub risk_per_share: f64,
    pub max_loss: f64,
    pub status: TradeStatus,
    #[serde(default)]
    pub close_ts: Option<String>,
    #[serde(default)]
    pub close_spot: Option<f64>,
    #[serde(default)]
    pub reason: Option<CloseReason>,
    #[serde(default)]
    pub realized_pnl: Option<f64>,
}

impl PaperTrade {
    /// Calendar date the trade was opened, or `None` if `ts` does not parse.
    pub fn opened_on(&self) -> Option<NaiveDate> {
        parse_trade_date(&self.ts)
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }
}

/// Parse a journal timestamp: anything [`parse_timestamp`] accepts.
pub fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|ts| ts.date())
}
