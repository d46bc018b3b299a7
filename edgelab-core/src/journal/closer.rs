//! Retroactive trade closer.
//!
//! For every OPEN trade, scans the bars dated strictly after the open date
//! and no later than `open + max_hold_days`:
//!
//! - LONG: target when `high >= tp_spot`, stop when `low <= sl_spot`.
//! - SHORT: target when `low <= tp_spot`, stop when `high >= sl_spot`.
//!
//! The earlier of the two first-hit *dates* wins, and the target wins a
//! same-date tie. Intrabar order is not modelled. With no hit but at least
//! one bar in the window, the trade closes at the last in-window close
//! (reason TIME). With no bars in the window the trade stays OPEN.
//!
//! Bars must be in ascending timestamp order.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::TradeJournal;
use super::JournalError;
use crate::domain::{Bar, CloseReason, PaperTrade, Side, TradeStatus};
use crate::signal::{round_cents, round_to};

pub const DEFAULT_MAX_HOLD_DAYS: i64 = 20;

/// Result of one closer pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOutcome {
    /// Trades transitioned to CLOSED by this pass.
    pub closed: usize,
    /// Trades still OPEN after this pass.
    pub open_remaining: usize,
}

struct Exit {
    date: NaiveDate,
    spot: f64,
    reason: CloseReason,
}

/// Close every OPEN trade that resolved within its holding window.
///
/// CLOSED rows are never touched, so a second pass over the same data is a
/// no-op.
pub fn close_trades(trades: &mut [PaperTrade], bars: &[Bar], max_hold_days: i64) -> CloseOutcome {
    let mut closed = 0;
    for trade in trades.iter_mut().filter(|t| t.is_open()) {
        let Some(exit) = first_exit(trade, bars, max_hold_days) else {
            continue;
        };

        let pnl = match trade.side {
            Side::Long => (exit.spot - trade.entry_spot) * trade.shares as f64,
            Side::Short => (trade.entry_spot - exit.spot) * trade.shares as f64,
            Side::Flat => 0.0,
        };

        trade.status = TradeStatus::Closed;
        trade.close_ts = Some(exit.date.format("%Y-%m-%d").to_string());
        trade.close_spot = Some(round_to(exit.spot, 4));
        trade.reason = Some(exit.reason);
        trade.realized_pnl = Some(round_cents(pnl));
        closed += 1;
        debug!(
            ticker = %trade.ticker,
            reason = ?exit.reason,
            pnl = round_cents(pnl),
            "closed trade"
        );
    }

    CloseOutcome {
        closed,
        open_remaining: trades.iter().filter(|t| t.is_open()).count(),
    }
}

/// Load a journal, close what resolved, and write it back.
pub fn close_journal(
    journal: &TradeJournal,
    bars: &[Bar],
    max_hold_days: i64,
) -> Result<CloseOutcome, JournalError> {
    let mut trades = journal.load()?;
    if trades.is_empty() {
        return Ok(CloseOutcome {
            closed: 0,
            open_remaining: 0,
        });
    }
    let outcome = close_trades(&mut trades, bars, max_hold_days);
    journal.save(&trades)?;
    info!(
        closed = outcome.closed,
        open_remaining = outcome.open_remaining,
        "closer pass complete"
    );
    Ok(outcome)
}

fn first_exit(trade: &PaperTrade, bars: &[Bar], max_hold_days: i64) -> Option<Exit> {
    if trade.side == Side::Flat {
        return None;
    }
    let opened = trade.opened_on()?;
    let start = opened + Duration::days(1);
    let end = opened + Duration::days(max_hold_days);

    let mut window = bars
        .iter()
        .filter(|b| !b.is_void())
        .filter(|b| (start..=end).contains(&b.date()))
        .peekable();
    window.peek()?;

    let (tp, sl) = (trade.tp_spot, trade.sl_spot);
    let mut first_tp: Option<NaiveDate> = None;
    let mut first_sl: Option<NaiveDate> = None;
    let mut last: Option<&Bar> = None;

    for bar in window {
        let (tp_hit, sl_hit) = match trade.side {
            Side::Long => (bar.high >= tp, bar.low <= sl),
            _ => (bar.low <= tp, bar.high >= sl),
        };
        if tp_hit && first_tp.is_none() {
            first_tp = Some(bar.date());
        }
        if sl_hit && first_sl.is_none() {
            first_sl = Some(bar.date());
        }
        last = Some(bar);
    }

    match (first_tp, first_sl) {
        (Some(t), s) if s.map_or(true, |s| t <= s) => Some(Exit {
            date: t,
            spot: tp,
            reason: CloseReason::Tp,
        }),
        (_, Some(s)) => Some(Exit {
            date: s,
            spot: sl,
            reason: CloseReason::Sl,
        }),
        _ => last.map(|b| Exit {
            date: b.date(),
            spot: b.close,
            reason: CloseReason::Time,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bar(d: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: day(d).and_hms_opt(0, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    fn trade(side: Side, ts: &str) -> PaperTrade {
        PaperTrade {
            ts: ts.into(),
            ticker: "SPY".into(),
            side,
            entry_spot: 100.0,
            tp_spot: if side == Side::Short { 95.0 } else { 105.0 },
            sl_spot: if side == Side::Short { 103.0 } else { 97.0 },
            shares: 10,
            contracts: 0,
            risk_per_share: 3.0,
            max_loss: 30.0,
            status: TradeStatus::Open,
            close_ts: None,
            close_spot: None,
            reason: None,
            realized_pnl: None,
        }
    }

    #[test]
    fn earlier_target_date_beats_later_stop() {
        // opened day 1; target on day 3, stop on day 5
        let bars = vec![
            bar(1, 110.0, 90.0, 100.0),
            bar(2, 101.0, 99.0, 100.0),
            bar(3, 106.0, 99.0, 104.0),
            bar(4, 104.0, 99.0, 100.0),
            bar(5, 101.0, 96.0, 97.0),
        ];
        let mut trades = vec![trade(Side::Long, "2024-03-01 16:00:00")];
        let out = close_trades(&mut trades, &bars, 20);

        assert_eq!(out, CloseOutcome { closed: 1, open_remaining: 0 });
        let t = &trades[0];
        assert_eq!(t.reason, Some(CloseReason::Tp));
        assert_eq!(t.close_ts.as_deref(), Some("2024-03-03"));
        assert_eq!(t.close_spot, Some(105.0));
        assert_eq!(t.realized_pnl, Some(50.0));
    }

    #[test]
    fn entry_day_bar_is_ignored() {
        // the day-1 bar would hit the stop but is the entry day
        let bars = vec![bar(1, 101.0, 90.0, 95.0), bar(2, 101.0, 99.0, 100.5)];
        let mut trades = vec![trade(Side::Long, "2024-03-01")];
        close_trades(&mut trades, &bars, 20);
        assert_eq!(trades[0].reason, Some(CloseReason::Time));
        assert_eq!(trades[0].close_spot, Some(100.5));
        assert_eq!(trades[0].realized_pnl, Some(5.0));
    }

    #[test]
    fn same_day_hit_goes_to_target() {
        let bars = vec![bar(4, 106.0, 96.0, 100.0)];
        let mut trades = vec![trade(Side::Long, "2024-03-01")];
        close_trades(&mut trades, &bars, 20);
        assert_eq!(trades[0].reason, Some(CloseReason::Tp));
    }

    #[test]
    fn short_roles_invert() {
        let bars = vec![bar(2, 101.0, 99.0, 100.0), bar(3, 104.0, 98.0, 103.5)];
        let mut trades = vec![trade(Side::Short, "2024-03-01")];
        close_trades(&mut trades, &bars, 20);
        let t = &trades[0];
        assert_eq!(t.reason, Some(CloseReason::Sl));
        assert_eq!(t.close_spot, Some(103.0));
        assert_eq!(t.realized_pnl, Some(-30.0));
    }

    #[test]
    fn time_exit_uses_last_bar_in_window() {
        let bars = vec![
            bar(2, 101.0, 99.0, 100.2),
            bar(3, 101.0, 99.0, 100.7),
            bar(9, 101.0, 99.0, 99.0),
        ];
        let mut trades = vec![trade(Side::Long, "2024-03-01")];
        close_trades(&mut trades, &bars, 2);
        assert_eq!(trades[0].reason, Some(CloseReason::Time));
        assert_eq!(trades[0].close_ts.as_deref(), Some("2024-03-03"));
        assert_eq!(trades[0].close_spot, Some(100.7));
        assert_eq!(trades[0].realized_pnl, Some(7.0));
    }

    #[test]
    fn no_bars_in_window_stays_open() {
        let bars = vec![bar(1, 200.0, 1.0, 100.0)];
        let mut trades = vec![trade(Side::Long, "2024-03-01")];
        let out = close_trades(&mut trades, &bars, 20);
        assert_eq!(out, CloseOutcome { closed: 0, open_remaining: 1 });
        assert!(trades[0].is_open());
    }

    #[test]
    fn flat_and_malformed_rows_are_left_alone() {
        let bars = vec![bar(2, 200.0, 1.0, 100.0)];
        let mut trades = vec![trade(Side::Flat, "2024-03-01"), trade(Side::Long, "not a date")];
        let before = trades.clone();
        let out = close_trades(&mut trades, &bars, 20);
        assert_eq!(out.closed, 0);
        assert_eq!(out.open_remaining, 2);
        assert_eq!(trades, before);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let bars = vec![bar(2, 106.0, 99.0, 105.5), bar(3, 120.0, 80.0, 90.0)];
        let mut trades = vec![trade(Side::Long, "2024-03-01"), trade(Side::Long, "2024-03-10")];
        let first = close_trades(&mut trades, &bars, 20);
        let snapshot = trades.clone();
        let second = close_trades(&mut trades, &bars, 20);

        assert_eq!(first, CloseOutcome { closed: 1, open_remaining: 1 });
        assert_eq!(second, CloseOutcome { closed: 0, open_remaining: 1 });
        assert_eq!(trades, snapshot);
    }

    #[test]
    fn journal_pass_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TradeJournal::new(dir.path().join("trades_log.csv"));
        journal.append(&trade(Side::Long, "2024-03-01")).unwrap();

        let bars = vec![bar(2, 106.0, 99.0, 105.5)];
        let out = close_journal(&journal, &bars, 20).unwrap();
        assert_eq!(out.closed, 1);

        let reloaded = journal.load().unwrap();
        assert_eq!(reloaded[0].status, TradeStatus::Closed);
        assert_eq!(reloaded[0].realized_pnl, Some(50.0));
    }

    #[test]
    fn empty_journal_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TradeJournal::new(dir.path().join("trades_log.csv"));
        let out = close_journal(&journal, &[], 20).unwrap();
        assert_eq!(out, CloseOutcome { closed: 0, open_remaining: 0 });
        assert!(!journal.path().exists());
    }
}
