//! Forecast distribution and directional bias.

use serde::{Deserialize, Serialize};

/// Predicted distribution of the forward return for one bar.
///
/// `q_lo`, `q_md`, `q_hi` are the lower, median and upper conditional
/// quantiles; `mu` is the point (mean) estimate. The quantiles are not
/// guaranteed to be ordered unless the forecaster was asked to sort them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastDistribution {
    pub q_lo: f64,
    pub q_md: f64,
    pub q_hi: f64,
    pub mu: f64,
}

impl ForecastDistribution {
    /// True when `q_lo <= q_md <= q_hi`.
    pub fn is_ordered(&self) -> bool {
        self.q_lo <= self.q_md && self.q_md <= self.q_hi
    }
}

/// Direction of a trade or signal. Written upper case; lower and title
/// case are accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    #[serde(alias = "long", alias = "Long")]
    Long,
    #[serde(alias = "short", alias = "Short")]
    Short,
    #[serde(alias = "flat", alias = "Flat")]
    Flat,
}

impl Side {
    /// Direction from the sign of the median forecast.
    pub fn from_median(q_md: f64) -> Self {
        if q_md > 0.0 {
            Side::Long
        } else if q_md < 0.0 {
            Side::Short
        } else {
            Side::Flat
        }
    }

    /// +1 for long, -1 for short, 0 for flat.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
            Side::Flat => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
            Side::Flat => "FLAT",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
