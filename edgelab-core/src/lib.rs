//! EdgeLab Core: labeling, features, forecasting, trade translation and the
//! paper-trade journal.
//!
//! This crate holds every pure transform of the research pipeline:
//! - Domain types (bars, forecasts, paper trades, watchlist ideas)
//! - Price ingestion, validation, caching and providers
//! - Triple-barrier labeler and causal feature builder
//! - Quantile GBM + ridge forecaster
//! - Forecast-to-trade translator and position sizer
//! - Trade journal with the retroactive closer
//! - Watchlist planner and end-of-day idea evaluator

pub mod data;
pub mod domain;
pub mod evaluator;
pub mod features;
pub mod forecast;
pub mod indicators;
pub mod journal;
pub mod labeling;
pub mod signal;
pub mod sizing;
pub mod watchlist;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across runner threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::PaperTrade>();
        require_sync::<domain::PaperTrade>();
        require_send::<domain::TradeIdea>();
        require_sync::<domain::TradeIdea>();
        require_send::<domain::ForecastDistribution>();
        require_sync::<domain::ForecastDistribution>();

        require_send::<labeling::LabeledBar>();
        require_sync::<labeling::LabeledBar>();
        require_send::<features::FeatureRow>();
        require_sync::<features::FeatureRow>();
        require_send::<forecast::QuantileForecaster>();
        require_sync::<forecast::QuantileForecaster>();

        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::DatasetStore>();
        require_sync::<data::DatasetStore>();
        require_send::<journal::TradeJournal>();
        require_sync::<journal::TradeJournal>();
    }

    #[test]
    fn send_sync_compiles() {
        assert_send_sync();
    }
}
