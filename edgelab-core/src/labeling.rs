//! Triple-barrier labeling.
//!
//! For each bar t with enough history and enough future:
//!
//! ```text
//! r[t]      = close[t] / close[t-1] - 1
//! sigma[t]  = sample std of r[t-L .. t-1]          (window ends one bar before t)
//! fwd[t]    = (close[t+h] - close[t]) / close[t]
//! ret_tp    = (max high over (t, t+h] - close[t]) / close[t]
//! ret_sl    = (close[t] - min low over (t, t+h]) / close[t]
//! label     = +1 if ret_tp >= sigma*tp_sigma
//!             -1 else if ret_sl >= sigma*sl_sigma
//!              0 otherwise
//! ```
//!
//! The upper barrier is checked first, so a bar that reaches both is +1.
//! Rows missing any quantity (or producing a non-finite one) are dropped;
//! the output is a contiguous run of the input minus warmup and tail.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Bar;
use crate::indicators::{pct_change, rolling_std, shift};

/// Barrier and window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Forward window length in bars.
    pub horizon: usize,
    /// Upper barrier distance in units of sigma.
    pub tp_sigma: f64,
    /// Lower barrier distance in units of sigma.
    pub sl_sigma: f64,
    /// Number of returns in the volatility window.
    pub vol_lookback: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            horizon: 20,
            tp_sigma: 1.0,
            sl_sigma: 0.7,
            vol_lookback: 50,
        }
    }
}

impl LabelConfig {
    /// Index of the first bar that can carry a sigma.
    pub fn first_labeled_index(&self) -> usize {
        self.vol_lookback + 1
    }
}

/// A bar with its barrier outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledBar {
    pub bar: Bar,
    /// -1, 0 or +1.
    pub label: i8,
    pub forward_return: f64,
    pub sigma: f64,
}

/// Label a time-ordered bar series.
///
/// A zero `horizon` or a `vol_lookback` below two (sample std undefined)
/// labels nothing.
pub fn label_bars(bars: &[Bar], cfg: &LabelConfig) -> Vec<LabeledBar> {
    let n = bars.len();
    let h = cfg.horizon;
    if h == 0 || cfg.vol_lookback < 2 || n <= h {
        return Vec::new();
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = pct_change(&closes, 1);
    let sigma = shift(&rolling_std(&returns, cfg.vol_lookback), 1);

    let mut out = Vec::with_capacity(n.saturating_sub(cfg.first_labeled_index() + h));
    for t in 0..n - h {
        let s = sigma[t];
        let c0 = closes[t];
        if !s.is_finite() || c0 == 0.0 || !c0.is_finite() {
            continue;
        }

        let window = &bars[t + 1..=t + h];
        let max_high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        let forward_return = (closes[t + h] - c0) / c0;
        let ret_tp = (max_high - c0) / c0;
        let ret_sl = (c0 - min_low) / c0;
        if !(forward_return.is_finite() && ret_tp.is_finite() && ret_sl.is_finite()) {
            continue;
        }

        let label = if ret_tp >= s * cfg.tp_sigma {
            1
        } else if ret_sl >= s * cfg.sl_sigma {
            -1
        } else {
            0
        };

        out.push(LabeledBar {
            bar: bars[t].clone(),
            label,
            forward_return,
            sigma: s,
        });
    }

    debug!(input = n, labeled = out.len(), "labeled bars");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, sample_std, DEFAULT_EPSILON};

    fn small_cfg() -> LabelConfig {
        LabelConfig {
            horizon: 3,
            tp_sigma: 0.8,
            sl_sigma: 0.6,
            vol_lookback: 5,
        }
    }

    fn wavy(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 3.0 * ((i as f64) * 0.7).sin() + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn drops_warmup_and_tail() {
        let bars = make_bars(&wavy(40));
        let cfg = small_cfg();
        let labeled = label_bars(&bars, &cfg);

        // first sigma at L+1, last row with a full forward window at n-h-1
        assert_eq!(labeled.len(), 40 - cfg.horizon - cfg.first_labeled_index());
        assert_eq!(labeled[0].bar, bars[cfg.first_labeled_index()]);
        assert_eq!(labeled.last().unwrap().bar, bars[40 - cfg.horizon - 1]);
    }

    #[test]
    fn sigma_uses_only_returns_before_t() {
        let closes = wavy(30);
        let bars = make_bars(&closes);
        let cfg = small_cfg();
        let labeled = label_bars(&bars, &cfg);

        let t = cfg.first_labeled_index() + 4;
        let row = labeled.iter().find(|l| l.bar == bars[t]).unwrap();
        let rets: Vec<f64> = (t - cfg.vol_lookback..t)
            .map(|k| closes[k] / closes[k - 1] - 1.0)
            .collect();
        assert_approx(row.sigma, sample_std(&rets), DEFAULT_EPSILON);
        assert_approx(
            row.forward_return,
            (closes[t + 3] - closes[t]) / closes[t],
            DEFAULT_EPSILON,
        );
    }

    #[test]
    fn both_barriers_hit_labels_up() {
        let mut bars = make_bars(&wavy(20));
        let cfg = small_cfg();
        let t = 10;
        // huge range right after t touches both barriers
        bars[t + 1].high = bars[t].close * 1.5;
        bars[t + 1].low = bars[t].close * 0.5;
        let labeled = label_bars(&bars, &cfg);
        let row = labeled.iter().find(|l| l.bar == bars[t]).unwrap();
        assert_eq!(row.label, 1);
    }

    #[test]
    fn only_lower_barrier_hit_labels_down() {
        let closes = wavy(20);
        let mut bars = make_bars(&closes);
        let t = 10;
        for k in t + 1..=t + 3 {
            bars[k].high = closes[t];
        }
        bars[t + 2].low = closes[t] * 0.5;
        let labeled = label_bars(&bars, &small_cfg());
        let row = labeled.iter().find(|l| l.bar == bars[t]).unwrap();
        assert_eq!(row.label, -1);
    }

    #[test]
    fn quiet_window_labels_flat() {
        let closes = wavy(20);
        let mut bars = make_bars(&closes);
        let t = 10;
        for k in t + 1..=t + 3 {
            bars[k].high = closes[t];
            bars[k].low = closes[t];
        }
        let labeled = label_bars(&bars, &small_cfg());
        let row = labeled.iter().find(|l| l.bar == bars[t]).unwrap();
        assert_eq!(row.label, 0);
    }

    #[test]
    fn barrier_window_excludes_bar_t_itself() {
        let closes = wavy(20);
        let mut bars = make_bars(&closes);
        let t = 10;
        for k in t + 1..=t + 3 {
            bars[k].high = closes[t];
            bars[k].low = closes[t];
        }
        // an extreme high on bar t does not count
        bars[t].high = closes[t] * 2.0;
        let labeled = label_bars(&bars, &small_cfg());
        let row = labeled.iter().find(|l| l.bar == bars[t]).unwrap();
        assert_eq!(row.label, 0);
    }

    #[test]
    fn constant_prices_give_zero_sigma_and_label_up() {
        // sigma = 0, ret_tp = high-based 1/close > 0 = tp
        let bars = make_bars(&[100.0; 20]);
        let labeled = label_bars(&bars, &small_cfg());
        assert!(!labeled.is_empty());
        assert!(labeled.iter().all(|l| l.sigma == 0.0 && l.label == 1));
    }

    #[test]
    fn too_short_or_degenerate_config_labels_nothing() {
        let bars = make_bars(&wavy(8));
        assert!(label_bars(&bars, &small_cfg()).is_empty());
        let cfg = LabelConfig {
            horizon: 0,
            ..small_cfg()
        };
        assert!(label_bars(&make_bars(&wavy(40)), &cfg).is_empty());
    }
}
