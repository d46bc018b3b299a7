//! Relative Strength Index with simple (non-Wilder) averaging.
//!
//! delta[t] = close[t] - close[t-1]; average gain and loss are plain rolling
//! means over `period` deltas. RSI = 100 - 100 / (1 + gain/loss).
//! Lookback: period (the first delta is undefined).
//!
//! A window with no losses gives 100; a window with neither gains nor losses
//! is undefined (NaN).

use super::{rolling_mean, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for t in 1..n {
            let delta = bars[t].close - bars[t - 1].close;
            gains[t] = delta.max(0.0);
            losses[t] = (-delta).max(0.0);
        }

        let avg_gain = rolling_mean(&gains, self.period);
        let avg_loss = rolling_mean(&losses, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() || (g == 0.0 && l == 0.0) {
                    f64::NAN
                } else if l == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + g / l)
                }
            })
            .collect()
    }
}
