//! End-of-day scoring of watchlist ideas against a daily bar.
//!
//! An idea is triggered when the day's high reaches its entry. A triggered
//! idea wins if only the target was reached, loses if only the stop was,
//! and stays open if neither was. When the bar spans both levels the order
//! is unknown from daily data and [`SameBarPolicy`] decides.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, TradeIdea};
use crate::signal::round_to;

/// Default buffer above entry before a live price counts as a trigger.
pub const DEFAULT_BUFFER_BPS: f64 = 10.0;

/// Resolution of a bar that touched both target and stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameBarPolicy {
    /// Whichever level is nearer the open is assumed hit first; a tie is a loss.
    #[default]
    OpenDistance,
    /// Always a loss.
    WorstCase,
    /// Always a win.
    BestCase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Open,
    NoTrigger,
    NoData,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Open => "open",
            Outcome::NoTrigger => "no_trigger",
            Outcome::NoData => "no_data",
        }
    }
}

/// One scored idea, values rounded for the evaluation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaEvaluation {
    pub symbol: String,
    pub triggered: bool,
    pub result: Outcome,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub rr: f64,
}

/// Score `idea` against the day's bar, or `NoData` when there is none.
pub fn evaluate_idea(idea: &TradeIdea, day: Option<&Bar>, policy: SameBarPolicy) -> IdeaEvaluation {
    let rr = round_to(
        (idea.target - idea.entry).abs() / (idea.entry - idea.stop).abs().max(1e-9),
        2,
    );
    let mut eval = IdeaEvaluation {
        symbol: idea.symbol.clone(),
        triggered: false,
        result: Outcome::NoData,
        open: None,
        high: None,
        low: None,
        close: None,
        entry: round_to(idea.entry, 4),
        stop: round_to(idea.stop, 4),
        target: round_to(idea.target, 4),
        rr,
    };
    let Some(bar) = day.filter(|b| !b.is_void()) else {
        return eval;
    };

    eval.open = Some(round_to(bar.open, 4));
    eval.high = Some(round_to(bar.high, 4));
    eval.low = Some(round_to(bar.low, 4));
    eval.close = Some(round_to(bar.close, 4));
    eval.triggered = bar.high >= idea.entry;

    eval.result = if !eval.triggered {
        Outcome::NoTrigger
    } else {
        let hit_target = bar.high >= idea.target;
        let hit_stop = bar.low <= idea.stop;
        match (hit_target, hit_stop) {
            (true, false) => Outcome::Win,
            (false, true) => Outcome::Loss,
            (false, false) => Outcome::Open,
            (true, true) => resolve_same_bar(idea, bar.open, policy),
        }
    };
    eval
}

fn resolve_same_bar(idea: &TradeIdea, open: f64, policy: SameBarPolicy) -> Outcome {
    match policy {
        SameBarPolicy::WorstCase => Outcome::Loss,
        SameBarPolicy::BestCase => Outcome::Win,
        SameBarPolicy::OpenDistance => {
            if (idea.target - open).abs() < (open - idea.stop).abs() {
                Outcome::Win
            } else {
                Outcome::Loss
            }
        }
    }
}

/// Long-only live trigger: `last >= entry * (1 + buffer_bps / 1e4)`.
pub fn entry_triggered(entry: f64, last: f64, buffer_bps: f64) -> bool {
    last >= entry * (1.0 + buffer_bps / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetClass;
    use chrono::NaiveDate;

    fn idea() -> TradeIdea {
        TradeIdea {
            symbol: "SPY".into(),
            asset_class: AssetClass::Equity,
            entry: 100.0,
            stop: 97.0,
            target: 106.0,
            units: 3,
            rsi: 55.0,
            atr: 2.0,
        }
    }

    fn day(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn score(bar: &Bar) -> Outcome {
        evaluate_idea(&idea(), Some(bar), SameBarPolicy::default()).result
    }

    #[test]
    fn single_level_outcomes() {
        assert_eq!(score(&day(99.0, 99.9, 95.0, 96.0)), Outcome::NoTrigger);
        assert_eq!(score(&day(99.0, 107.0, 98.0, 105.0)), Outcome::Win);
        assert_eq!(score(&day(99.0, 101.0, 96.0, 97.0)), Outcome::Loss);
        assert_eq!(score(&day(99.0, 101.0, 98.0, 100.5)), Outcome::Open);
    }

    #[test]
    fn both_levels_follow_policy() {
        // open near the target
        let near_target = day(105.0, 107.0, 96.0, 100.0);
        assert_eq!(score(&near_target), Outcome::Win);
        // open near the stop
        let near_stop = day(98.0, 107.0, 96.0, 100.0);
        assert_eq!(score(&near_stop), Outcome::Loss);

        let i = idea();
        assert_eq!(
            evaluate_idea(&i, Some(&near_target), SameBarPolicy::WorstCase).result,
            Outcome::Loss
        );
        assert_eq!(
            evaluate_idea(&i, Some(&near_stop), SameBarPolicy::BestCase).result,
            Outcome::Win
        );
    }

    #[test]
    fn missing_bar_is_no_data() {
        let e = evaluate_idea(&idea(), None, SameBarPolicy::default());
        assert_eq!(e.result, Outcome::NoData);
        assert!(!e.triggered);
        assert_eq!(e.rr, 2.0);
        assert_eq!(e.high, None);
    }

    #[test]
    fn live_trigger_respects_buffer() {
        assert!(!entry_triggered(100.0, 100.05, DEFAULT_BUFFER_BPS));
        assert!(entry_triggered(100.0, 100.11, DEFAULT_BUFFER_BPS));
        assert!(entry_triggered(100.0, 100.0, 0.0));
    }
}
