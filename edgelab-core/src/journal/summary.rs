//! Overall and per-ticker statistics over CLOSED trades.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{parse_trade_date, PaperTrade, TradeStatus};
use crate::signal::round_cents;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStats {
    pub ticker: String,
    pub trades: usize,
    pub win_rate_pct: f64,
    pub net_pnl: f64,
    pub avg_pnl: f64,
    pub avg_hold_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub open: usize,
    pub win_rate_pct: f64,
    pub net_pnl: f64,
    pub avg_pnl: f64,
    pub best: f64,
    pub worst: f64,
    pub avg_hold_days: Option<f64>,
    /// Sorted by net PnL, best first.
    pub per_ticker: Vec<SymbolStats>,
}

struct Closed<'a> {
    ticker: &'a str,
    pnl: f64,
    hold_days: Option<f64>,
}

pub fn summarize(trades: &[PaperTrade]) -> JournalSummary {
    let closed: Vec<Closed> = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Closed)
        .map(|t| Closed {
            ticker: &t.ticker,
            pnl: t.realized_pnl.unwrap_or(0.0),
            hold_days: hold_days(t),
        })
        .collect();
    let open = trades.iter().filter(|t| t.is_open()).count();

    if closed.is_empty() {
        return JournalSummary {
            trades: 0,
            wins: 0,
            losses: 0,
            open,
            win_rate_pct: 0.0,
            net_pnl: 0.0,
            avg_pnl: 0.0,
            best: 0.0,
            worst: 0.0,
            avg_hold_days: None,
            per_ticker: Vec::new(),
        };
    }

    let refs: Vec<&Closed> = closed.iter().collect();
    let (net, avg, rate) = pnl_stats(&refs);

    let mut by_ticker: BTreeMap<&str, Vec<&Closed>> = BTreeMap::new();
    for c in &closed {
        by_ticker.entry(c.ticker).or_default().push(c);
    }
    let mut per_ticker: Vec<SymbolStats> = by_ticker
        .into_iter()
        .map(|(ticker, rows)| {
            let (net_pnl, avg_pnl, win_rate_pct) = pnl_stats(&rows);
            SymbolStats {
                ticker: ticker.to_string(),
                trades: rows.len(),
                win_rate_pct,
                net_pnl,
                avg_pnl,
                avg_hold_days: mean_hold(&rows),
            }
        })
        .collect();
    per_ticker.sort_by(|a, b| b.net_pnl.total_cmp(&a.net_pnl));

    JournalSummary {
        trades: closed.len(),
        wins: closed.iter().filter(|c| c.pnl > 0.0).count(),
        losses: closed.iter().filter(|c| c.pnl < 0.0).count(),
        open,
        win_rate_pct: rate,
        net_pnl: net,
        avg_pnl: avg,
        best: round_cents(closed.iter().map(|c| c.pnl).fold(f64::NEG_INFINITY, f64::max)),
        worst: round_cents(closed.iter().map(|c| c.pnl).fold(f64::INFINITY, f64::min)),
        avg_hold_days: mean_hold(&refs),
        per_ticker,
    }
}

/// (net, mean, win rate %) rounded to cents.
fn pnl_stats(rows: &[&Closed]) -> (f64, f64, f64) {
    let n = rows.len().max(1) as f64;
    let net: f64 = rows.iter().map(|c| c.pnl).sum();
    let wins = rows.iter().filter(|c| c.pnl > 0.0).count() as f64;
    (round_cents(net), round_cents(net / n), round_cents(100.0 * wins / n))
}

fn mean_hold(rows: &[&Closed]) -> Option<f64> {
    let days: Vec<f64> = rows.iter().filter_map(|c| c.hold_days).collect();
    if days.is_empty() {
        return None;
    }
    Some((days.iter().sum::<f64>() / days.len() as f64 * 10.0).round() / 10.0)
}

fn hold_days(t: &PaperTrade) -> Option<f64> {
    let opened = t.opened_on()?;
    let closed = parse_trade_date(t.close_ts.as_deref()?)?;
    Some((closed - opened).num_days() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloseReason, Side};

    fn closed(ticker: &str, pnl: f64, close_ts: &str) -> PaperTrade {
        PaperTrade {
            ts: "2024-03-01".into(),
            ticker: ticker.into(),
            side: Side::Long,
            entry_spot: 100.0,
            tp_spot: 105.0,
            sl_spot: 97.0,
            shares: 10,
            contracts: 0,
            risk_per_share: 3.0,
            max_loss: 30.0,
            status: TradeStatus::Closed,
            close_ts: Some(close_ts.into()),
            close_spot: Some(100.0),
            reason: Some(CloseReason::Time),
            realized_pnl: Some(pnl),
        }
    }

    #[test]
    fn empty_journal_summary_is_zeroed() {
        let s = summarize(&[]);
        assert_eq!(s.trades, 0);
        assert_eq!(s.win_rate_pct, 0.0);
        assert!(s.per_ticker.is_empty());
    }

    #[test]
    fn overall_and_per_ticker_stats() {
        let mut open = closed("SPY", 0.0, "2024-03-01");
        open.status = TradeStatus::Open;
        open.realized_pnl = None;
        let trades = vec![
            closed("SPY", 50.0, "2024-03-03"),
            closed("SPY", -30.0, "2024-03-05"),
            closed("QQQ", 90.0, "2024-03-02"),
            open,
        ];
        let s = summarize(&trades);

        assert_eq!(s.trades, 3);
        assert_eq!(s.wins, 2);
        assert_eq!(s.losses, 1);
        assert_eq!(s.open, 1);
        assert_eq!(s.win_rate_pct, 66.67);
        assert_eq!(s.net_pnl, 110.0);
        assert_eq!(s.avg_pnl, 36.67);
        assert_eq!(s.best, 90.0);
        assert_eq!(s.worst, -30.0);
        assert_eq!(s.avg_hold_days, Some(2.3));

        assert_eq!(s.per_ticker[0].ticker, "QQQ");
        assert_eq!(s.per_ticker[1].ticker, "SPY");
        assert_eq!(s.per_ticker[1].trades, 2);
        assert_eq!(s.per_ticker[1].win_rate_pct, 50.0);
        assert_eq!(s.per_ticker[1].net_pnl, 20.0);
        assert_eq!(s.per_ticker[1].avg_hold_days, Some(3.0));
    }
}
