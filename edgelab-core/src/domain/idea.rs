//! Trade idea: a watchlist entry with fixed entry/stop/target levels.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Crypto,
}

/// Immutable once produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIdea {
    pub symbol: String,
    #[serde(rename = "asset")]
    pub asset_class: AssetClass,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub units: u64,
    pub rsi: f64,
    pub atr: f64,
}

impl TradeIdea {
    /// Reward-to-risk of the planned levels.
    pub fn reward_risk(&self) -> f64 {
        (self.target - self.entry).abs() / (self.entry - self.stop).abs().max(1e-9)
    }
}
