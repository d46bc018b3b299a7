//! Trailing feature vectors.
//!
//! Column order is fixed: `r1, r5, r10, ma5, ma10, vol5, vol10, hi_lo`.
//! Every feature at row t is a function of rows `t-10 ..= t` only, so the
//! first ten rows of any input never produce a vector.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{pct_change, rolling_mean, rolling_std};
use crate::labeling::LabeledBar;

pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["r1", "r5", "r10", "ma5", "ma10", "vol5", "vol10", "hi_lo"];
pub const N_FEATURES: usize = 8;

/// Rows consumed by the longest trailing window.
pub const FEATURE_WARMUP: usize = 10;

/// One training/inference example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub values: [f64; N_FEATURES],
    pub forward_return: f64,
    pub label: i8,
}

/// Features for each labeled row that has full trailing history.
pub fn build_features(labeled: &[LabeledBar]) -> Vec<FeatureRow> {
    let bars: Vec<Bar> = labeled.iter().map(|l| l.bar.clone()).collect();
    compute_vectors(&bars)
        .into_iter()
        .zip(labeled)
        .filter_map(|(values, l)| {
            values.map(|values| FeatureRow {
                timestamp: l.bar.timestamp,
                values,
                forward_return: l.forward_return,
                label: l.label,
            })
        })
        .collect()
}

/// Features for raw bars with no target attached; rows without full trailing
/// history are skipped.
pub fn bar_features(bars: &[Bar]) -> Vec<(NaiveDateTime, [f64; N_FEATURES])> {
    compute_vectors(bars)
        .into_iter()
        .zip(bars)
        .filter_map(|(values, b)| values.map(|v| (b.timestamp, v)))
        .collect()
}

/// Per-row feature vector, `None` where any component is undefined.
pub fn compute_vectors(bars: &[Bar]) -> Vec<Option<[f64; N_FEATURES]>> {
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let r1 = pct_change(&close, 1);
    let r5 = pct_change(&close, 5);
    let r10 = pct_change(&close, 10);
    let sma5 = rolling_mean(&close, 5);
    let sma10 = rolling_mean(&close, 10);
    let vol5 = rolling_std(&r1, 5);
    let vol10 = rolling_std(&r1, 10);

    (0..bars.len())
        .map(|t| {
            let c = close[t];
            let v = [
                r1[t],
                r5[t],
                r10[t],
                sma5[t] / c - 1.0,
                sma10[t] / c - 1.0,
                vol5[t],
                vol10[t],
                (bars[t].high - bars[t].low) / c,
            ];
            v.iter().all(|x| x.is_finite()).then_some(v)
        })
        .collect()
}
