//! Position sizing.
//!
//! Equity trades risk a fixed fraction of equity between entry and stop,
//! capped by available leverage. Option trades spend at most a fixed
//! fraction of equity on premium. Degenerate inputs size to zero instead of
//! erroring.
//!
//! # Formula
//! ```text
//! risk_budget    = equity * risk_pct
//! risk_per_share = |spot - stop|
//! shares         = floor(min(risk_budget / risk_per_share, equity * max_leverage / spot))
//! contracts      = floor(equity * max_premium_pct / (premium * multiplier))
//! ```

use serde::{Deserialize, Serialize};

/// Standard equity option contract size.
pub const DEFAULT_MULTIPLIER: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySize {
    pub shares: u64,
    pub risk_per_share: f64,
    pub max_loss: f64,
    pub risk_budget: f64,
    /// |target - spot| / risk_per_share; 0 when unsized.
    pub reward_risk: f64,
}

impl EquitySize {
    pub fn zero() -> Self {
        Self {
            shares: 0,
            risk_per_share: 0.0,
            max_loss: 0.0,
            risk_budget: 0.0,
            reward_risk: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionSize {
    pub contracts: u64,
    pub premium_budget: f64,
    pub max_spend: f64,
}

/// Size a share position.
pub fn size_equity(
    equity: f64,
    risk_pct: f64,
    max_leverage: f64,
    spot: f64,
    stop: f64,
    target: f64,
) -> EquitySize {
    if !(spot > 0.0) || !(stop > 0.0) || !equity.is_finite() {
        return EquitySize::zero();
    }
    let risk_per_share = (spot - stop).abs();
    if risk_per_share == 0.0 {
        return EquitySize::zero();
    }

    let risk_budget = equity * risk_pct;
    let by_risk = risk_budget / risk_per_share;
    let by_capital = equity * max_leverage / spot;
    let raw = by_risk.min(by_capital).max(0.0);
    let shares = if raw.is_finite() { raw.floor() as u64 } else { 0 };

    EquitySize {
        shares,
        risk_per_share,
        max_loss: shares as f64 * risk_per_share,
        risk_budget,
        reward_risk: (target - spot).abs() / risk_per_share,
    }
}

/// Size an option position. A missing or non-positive premium buys nothing.
pub fn size_option(
    equity: f64,
    max_premium_pct: f64,
    premium: Option<f64>,
    multiplier: u32,
) -> OptionSize {
    let premium_budget = equity * max_premium_pct;
    let per_contract = match premium {
        Some(p) if p > 0.0 && multiplier > 0 => p * multiplier as f64,
        _ => {
            return OptionSize {
                contracts: 0,
                premium_budget,
                max_spend: 0.0,
            }
        }
    };

    let raw = (premium_budget / per_contract).floor();
    let contracts = if raw.is_finite() && raw > 0.0 { raw as u64 } else { 0 };
    OptionSize {
        contracts,
        premium_budget,
        max_spend: contracts as f64 * per_contract,
    }
}
