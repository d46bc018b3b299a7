//! Walk-forward backtest: one chronological train/test cut.
//!
//! The forecaster is fit on rows `[0, cut)` and predicts rows `[cut, n)`.
//! Each test row trades the sign of the median forecast when it clears the
//! cost threshold and books `signal * forward_return - cost * |signal|`.
//!
//! Split:
//! - `cut = max(floor(n * train_frac), min_train)`
//! - `cut == 0` or `cut >= n` is insufficient data (no training or test rows)

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use edgelab_core::features::FeatureRow;
use edgelab_core::forecast::{ForecastError, ModelConfig, QuantileForecaster};

use crate::config::BacktestConfig;

// ─── Result types ────────────────────────────────────────────────────

/// One out-of-sample row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    #[serde(rename = "datetime")]
    pub timestamp: NaiveDateTime,
    pub q_lo: f64,
    pub q_md: f64,
    pub q_hi: f64,
    pub mu: f64,
    /// +1 long, -1 short, 0 flat.
    pub signal: i8,
    pub forward_return: f64,
    pub pnl: f64,
    pub equity: f64,
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("insufficient data: {rows} rows leave no test rows after a cut at {cut}")]
    InsufficientData { rows: usize, cut: usize },

    #[error("forecaster failed: {0}")]
    Forecast(#[from] ForecastError),
}

// ─── Split + trading rules ───────────────────────────────────────────

/// Smallest training set a config may ask for.
pub const MIN_TRAIN_ROWS: usize = 50;

/// Index of the first test row.
pub fn split_index(n: usize, train_frac: f64, min_train: usize) -> usize {
    ((n as f64 * train_frac).floor() as usize).max(min_train)
}

/// Trade direction for a median forecast against the cost threshold.
pub fn signal_for(q_md: f64, cost: f64) -> i8 {
    if q_md > cost {
        1
    } else if q_md < -cost {
        -1
    } else {
        0
    }
}

/// Net return of one row; flat rows pay nothing.
pub fn pnl_for(signal: i8, forward_return: f64, cost: f64) -> f64 {
    let s = signal as f64;
    s * forward_return - cost * s.abs()
}

/// Compounded equity, seeded at 1.0 before the first row.
pub fn equity_curve(pnl: &[f64]) -> Vec<f64> {
    pnl.iter()
        .scan(1.0, |eq, p| {
            *eq *= 1.0 + p;
            Some(*eq)
        })
        .collect()
}

// ─── Runner ──────────────────────────────────────────────────────────

/// Fit on the training slice and trade the test slice.
pub fn run_walk_forward(
    rows: &[FeatureRow],
    model: &ModelConfig,
    cfg: &BacktestConfig,
) -> Result<Vec<BacktestRow>, BacktestError> {
    let n = rows.len();
    let cut = split_index(n, cfg.train_frac, cfg.min_train);
    if cut == 0 || cut >= n {
        return Err(BacktestError::InsufficientData { rows: n, cut });
    }

    let (train, test) = rows.split_at(cut);
    debug!(train = train.len(), test = test.len(), "walk-forward split");

    let forecaster = QuantileForecaster::fit(model, train)?;
    let forecasts = forecaster.predict(test.iter().map(|r| &r.values))?;

    let cost = cfg.cost_bps * 1e-4;
    let signals: Vec<i8> = forecasts.iter().map(|f| signal_for(f.q_md, cost)).collect();
    let pnl: Vec<f64> = signals
        .iter()
        .zip(test)
        .map(|(&s, r)| pnl_for(s, r.forward_return, cost))
        .collect();
    let equity = equity_curve(&pnl);

    let out: Vec<BacktestRow> = test
        .iter()
        .zip(forecasts)
        .enumerate()
        .map(|(i, (row, f))| BacktestRow {
            timestamp: row.timestamp,
            q_lo: f.q_lo,
            q_md: f.q_md,
            q_hi: f.q_hi,
            mu: f.mu,
            signal: signals[i],
            forward_return: row.forward_return,
            pnl: pnl[i],
            equity: equity[i],
        })
        .collect();

    info!(
        test_rows = out.len(),
        final_equity = out.last().map(|r| r.equity).unwrap_or(1.0),
        "walk-forward complete"
    );
    Ok(out)
}
