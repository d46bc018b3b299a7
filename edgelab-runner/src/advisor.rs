//! Latest-signal advisor.
//!
//! Turns the last backtest row into an actionable suggestion against the
//! latest close, sizes it for the account, and optionally builds the OPEN
//! paper trade for the journal.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use edgelab_core::domain::{Bar, ForecastDistribution, PaperTrade, Side, TradeStatus};
use edgelab_core::indicators::sample_std;
use edgelab_core::signal::{round_cents, round_to, translate, TradeSuggestion};
use edgelab_core::sizing::{size_equity, size_option, EquitySize, OptionSize};

use crate::config::{AccountConfig, SignalConfig};
use crate::walk_forward::BacktestRow;

/// Timestamp layout of the signal log and journal `ts` column.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("no price bars to read a spot price from")]
    NoPrices,

    #[error("latest close {0} is not a usable spot price")]
    BadSpot(f64),
}

/// One row of the signal log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub ts: String,
    pub ticker: String,
    pub bias: Side,
    pub spot: f64,
    pub tp_spot: f64,
    pub sl_spot: f64,
    pub q_lo: f64,
    pub q_md: f64,
    pub q_hi: f64,
    pub sigma: f64,
    pub shares: u64,
    pub risk_per_share: f64,
    pub max_loss: f64,
    pub contracts: u64,
    pub max_spend: f64,
}

/// Everything the advisor derived for one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub record: SignalRecord,
    /// Levels rounded to cents.
    pub suggestion: TradeSuggestion,
    pub equity: EquitySize,
    pub option: OptionSize,
}

/// Sample std of the last `window` one-bar close returns, or `fallback`
/// when there are not enough bars or the value is not finite.
pub fn recent_sigma(bars: &[Bar], window: usize, fallback: f64) -> f64 {
    if window < 2 || bars.len() < window + 1 {
        return fallback;
    }
    let tail = &bars[bars.len() - window - 1..];
    let returns: Vec<f64> = tail
        .windows(2)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect();
    let sd = sample_std(&returns);
    if sd.is_finite() {
        sd
    } else {
        fallback
    }
}

/// Build the suggestion for `last` against the latest bar of `bars`.
pub fn advise(
    ticker: &str,
    last: &BacktestRow,
    bars: &[Bar],
    signal: &SignalConfig,
    account: &AccountConfig,
    now: NaiveDateTime,
) -> Result<Advice, AdviceError> {
    let spot = bars.last().map(|b| b.close).ok_or(AdviceError::NoPrices)?;
    if !(spot > 0.0) {
        return Err(AdviceError::BadSpot(spot));
    }
    let sigma = recent_sigma(bars, signal.sigma_window, signal.fallback_sigma);

    let dist = ForecastDistribution {
        q_lo: last.q_lo,
        q_md: last.q_md,
        q_hi: last.q_hi,
        mu: last.mu,
    };
    let mut suggestion = translate(spot, &dist, signal.horizon_bars);
    suggestion.target = round_cents(suggestion.target);
    suggestion.stop = round_cents(suggestion.stop);

    let equity = size_equity(
        account.equity,
        account.risk_per_trade_pct,
        account.max_leverage,
        spot,
        suggestion.stop,
        suggestion.target,
    );
    let option = size_option(
        account.equity,
        account.max_premium_pct,
        account.option_premium,
        account.contract_multiplier,
    );

    let record = SignalRecord {
        ts: now.format(TS_FORMAT).to_string(),
        ticker: ticker.to_string(),
        bias: suggestion.bias,
        spot: round_cents(spot),
        tp_spot: suggestion.target,
        sl_spot: suggestion.stop,
        q_lo: last.q_lo,
        q_md: last.q_md,
        q_hi: last.q_hi,
        sigma,
        shares: equity.shares,
        risk_per_share: equity.risk_per_share,
        max_loss: equity.max_loss,
        contracts: option.contracts,
        max_spend: option.max_spend,
    };
    info!(
        ticker,
        bias = %suggestion.bias,
        spot,
        target = suggestion.target,
        stop = suggestion.stop,
        shares = equity.shares,
        "latest signal"
    );

    Ok(Advice {
        record,
        suggestion,
        equity,
        option,
    })
}

/// The OPEN journal row for `advice`, opened at the unrounded latest close.
pub fn open_trade(advice: &Advice, spot: f64) -> PaperTrade {
    let r = &advice.record;
    PaperTrade {
        ts: r.ts.clone(),
        ticker: r.ticker.clone(),
        side: r.bias,
        entry_spot: round_to(spot, 4),
        tp_spot: round_to(r.tp_spot, 4),
        sl_spot: round_to(r.sl_spot, 4),
        shares: r.shares,
        contracts: r.contracts,
        risk_per_share: round_to(r.risk_per_share, 4),
        max_loss: round_to(r.max_loss, 2),
        status: TradeStatus::Open,
        close_ts: None,
        close_spot: None,
        reason: None,
        realized_pnl: None,
    }
}
