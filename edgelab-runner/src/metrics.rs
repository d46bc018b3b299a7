//! Backtest summary metrics: pure functions over the out-of-sample rows.

use serde::{Deserialize, Serialize};

use crate::walk_forward::BacktestRow;

/// Headline numbers for one walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Test rows with a non-zero signal.
    pub trades: usize,
    pub test_rows: usize,
    pub avg_pnl: f64,
    /// `mean(pnl) / (std(pnl) + 1e-9) * sqrt(252)` over all test rows.
    pub sharpe_like: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Fraction of traded rows with positive pnl.
    pub hit_rate: f64,
}

impl BacktestSummary {
    pub fn compute(rows: &[BacktestRow]) -> Self {
        let pnl: Vec<f64> = rows.iter().map(|r| r.pnl).collect();
        let equity: Vec<f64> = rows.iter().map(|r| r.equity).collect();
        let traded: Vec<f64> = rows.iter().filter(|r| r.signal != 0).map(|r| r.pnl).collect();
        let final_equity = equity.last().copied().unwrap_or(1.0);

        Self {
            trades: traded.len(),
            test_rows: rows.len(),
            avg_pnl: mean_f64(&pnl),
            sharpe_like: sharpe_like(&pnl),
            final_equity,
            total_return: final_equity - 1.0,
            max_drawdown: max_drawdown(&equity),
            hit_rate: if traded.is_empty() {
                0.0
            } else {
                traded.iter().filter(|p| **p > 0.0).count() as f64 / traded.len() as f64
            },
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Annualized mean/std ratio of per-row pnl with a small stabilizer.
pub fn sharpe_like(pnl: &[f64]) -> f64 {
    if pnl.is_empty() {
        return 0.0;
    }
    let sd = if pnl.len() < 2 { 0.0 } else { std_dev(pnl) };
    mean_f64(pnl) / (sd + 1e-9) * 252.0_f64.sqrt()
}

/// Maximum drawdown as a negative fraction, measured from a starting
/// equity of 1.0.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean_f64(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
