//! Deterministic synthetic price series for demos and tests.
//!
//! A geometric random walk on business days with normally distributed daily
//! returns (mean 0.0005, sd 0.01) starting at 100.0. Same seed, same bars.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataSource, FetchError, FetchResult, PriceProvider};
use crate::domain::Bar;

const START_PRICE: f64 = 100.0;
const DRIFT: f64 = 0.0005;
const DAILY_SD: f64 = 0.01;
const WICK_SD: f64 = 0.002;

/// `n` business-day bars starting on or after `start`.
pub fn random_walk_bars(start: NaiveDate, n: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(n);
    let mut date = start;
    let mut prev_close = START_PRICE;

    while bars.len() < n {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += chrono::Duration::days(1);
            continue;
        }
        let ret = DRIFT + DAILY_SD * standard_normal(&mut rng);
        let close = prev_close * (1.0 + ret);
        let open = if bars.is_empty() { close } else { prev_close };
        let high = open.max(close) * (1.0 + (WICK_SD * standard_normal(&mut rng)).abs());
        let low = open.min(close) * (1.0 - (WICK_SD * standard_normal(&mut rng)).abs());
        let volume = rng.gen_range(100_000..1_000_000u64) as f64;

        bars.push(Bar {
            timestamp: date.and_time(chrono::NaiveTime::MIN),
            open,
            high,
            low,
            close,
            volume,
        });
        prev_close = close;
        date += chrono::Duration::days(1);
    }
    bars
}

/// Box-Muller draw from N(0, 1).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Provider that never touches the network: the seed is derived from the
/// symbol name, so every symbol gets its own stable series.
#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    fn seed_for(symbol: &str) -> u64 {
        let hash = blake3::hash(symbol.as_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, FetchError> {
        let span = (end - start).num_days();
        if span < 0 {
            return Err(FetchError::Empty {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        // upper bound on business days in the span; clipped below
        let bars: Vec<Bar> = random_walk_bars(start, span as usize + 1, Self::seed_for(symbol))
            .into_iter()
            .filter(|b| b.date() <= end)
            .collect();
        if bars.is_empty() {
            return Err(FetchError::Empty {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::Synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_series() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(random_walk_bars(start, 50, 42), random_walk_bars(start, 50, 42));
        assert_ne!(random_walk_bars(start, 50, 42), random_walk_bars(start, 50, 43));
    }

    #[test]
    fn bars_are_sane_weekdays_in_order() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(); // a Saturday
        let bars = random_walk_bars(start, 300, 42);
        assert_eq!(bars.len(), 300);
        assert_eq!(bars[0].date(), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        for w in bars.windows(2) {
            assert!(w[0].timestamp < w[1].timestamp);
        }
        for b in &bars {
            assert!(b.is_sane(), "{b:?}");
            assert!(!matches!(b.date().weekday(), Weekday::Sat | Weekday::Sun));
        }
    }

    #[test]
    fn provider_respects_date_range() {
        let p = SyntheticProvider;
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let r = p.fetch("SPY", start, end).unwrap();
        assert_eq!(r.bars.len(), 23);
        assert!(r.bars.iter().all(|b| b.date() >= start && b.date() <= end));
        assert_eq!(r.bars, p.fetch("SPY", start, end).unwrap().bars);
    }

    #[test]
    fn inverted_range_is_empty_error() {
        let p = SyntheticProvider;
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(p.fetch("SPY", start, end), Err(FetchError::Empty { .. })));
    }
}
