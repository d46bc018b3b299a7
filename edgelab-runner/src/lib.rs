//! EdgeLab Runner: configuration, backtest orchestration, paper trading.
//!
//! This crate builds on `edgelab-core` to provide:
//! - TOML pipeline configuration with validation and run ids
//! - Data loading with cache/download/synthetic fallback
//! - Walk-forward backtest and summary metrics
//! - Latest-signal advisor and paper-trade opener
//! - Parallel watchlist scan and end-of-day evaluation
//! - CSV/JSON/Markdown artifact export

pub mod advisor;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod scan;
pub mod walk_forward;

pub use advisor::{advise, open_trade, recent_sigma, Advice, AdviceError, SignalRecord};
pub use config::{
    AccountConfig, BacktestConfig, CloserConfig, ConfigError, DataConfig, PipelineConfig,
    SignalConfig, WatchlistConfig,
};
pub use data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
pub use export::{BacktestManifest, EvalLogRow, SCHEMA_VERSION};
pub use metrics::BacktestSummary;
pub use runner::{
    backtest_bars, build_watchlist, close_paper_trades, evaluate_watchlist_file,
    journal_summary, latest_signal, open_paper_trade, run_backtest, watchlist_triggers, BacktestRun,
    RunError,
};
pub use scan::{
    check_triggers, evaluate_watchlist, scan_universe, scan_watchlist, ScanReport, SymbolFailure,
    TriggerStatus,
};
pub use walk_forward::{run_walk_forward, split_index, BacktestError, BacktestRow, MIN_TRAIN_ROWS};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn backtest_types_are_send_sync() {
        assert_send::<BacktestRow>();
        assert_sync::<BacktestRow>();
        assert_send::<BacktestSummary>();
        assert_sync::<BacktestSummary>();
        assert_send::<BacktestRun>();
        assert_sync::<BacktestRun>();
    }

    #[test]
    fn advice_types_are_send_sync() {
        assert_send::<Advice>();
        assert_sync::<Advice>();
        assert_send::<SignalRecord>();
        assert_sync::<SignalRecord>();
    }

    #[test]
    fn scan_report_is_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
