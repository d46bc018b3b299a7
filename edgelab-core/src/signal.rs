//! Forecast-to-trade translation.
//!
//! Bias follows the sign of the median forecast. Levels come straight from
//! the outer quantiles and are direction-agnostic: the target is always
//! `spot * (1 + q_hi)` and the stop `spot * (1 + q_lo)`.

use serde::{Deserialize, Serialize};

use crate::domain::{ForecastDistribution, Side};

/// Delta of the suggested option contract when there is a bias.
pub const OPTION_DELTA: f64 = 0.30;

/// Shortest suggested option expiry, in calendar days.
pub const MIN_OPTION_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

/// Optional option-structure hint attached to a biased signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionHint {
    pub right: OptionRight,
    pub delta: f64,
}

/// A tradeable suggestion derived from one forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSuggestion {
    pub bias: Side,
    pub spot: f64,
    pub target: f64,
    pub stop: f64,
    pub horizon_days_min: i64,
    pub option: Option<OptionHint>,
}

/// Translate a forecast into levels around `spot`.
///
/// `horizon_bars` is the forward window the model was trained for; the
/// suggested minimum holding horizon is `max(14, round(2.5 * horizon_bars))`
/// calendar days.
pub fn translate(spot: f64, forecast: &ForecastDistribution, horizon_bars: usize) -> TradeSuggestion {
    let bias = Side::from_median(forecast.q_md);
    let option = match bias {
        Side::Long => Some(OptionHint {
            right: OptionRight::Call,
            delta: OPTION_DELTA,
        }),
        Side::Short => Some(OptionHint {
            right: OptionRight::Put,
            delta: OPTION_DELTA,
        }),
        Side::Flat => None,
    };

    TradeSuggestion {
        bias,
        spot,
        target: spot * (1.0 + forecast.q_hi),
        stop: spot * (1.0 + forecast.q_lo),
        horizon_days_min: horizon_days_min(horizon_bars),
        option,
    }
}

pub fn horizon_days_min(horizon_bars: usize) -> i64 {
    let scaled = (horizon_bars as f64 * 2.5).round() as i64;
    scaled.max(MIN_OPTION_DAYS)
}

/// Round to cents for display and journaling.
pub fn round_cents(x: f64) -> f64 {
    round_to(x, 2)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);
    (x * m).round() / m
}
