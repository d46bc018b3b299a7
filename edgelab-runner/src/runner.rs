//! Pipeline runner: wires data loading, labeling, forecasting, the
//! backtest and the paper-trading loop to one dataset directory.
//!
//! Entry points, one per CLI command:
//! - `run_backtest()`: load → label → features → walk-forward → artifacts
//! - `latest_signal()` / `open_paper_trade()`: advise from the last test row
//! - `close_paper_trades()` / `journal_summary()`: settle and report the journal
//! - `build_watchlist()` / `evaluate_watchlist_file()`: daily scan and scoring
//! - `watchlist_triggers()`: live entry check against the saved watchlist

use chrono::{NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use edgelab_core::data::{DataError, DataSource, DatasetStore, PriceProvider};
use edgelab_core::domain::{Bar, PaperTrade, Side};
use edgelab_core::evaluator::IdeaEvaluation;
use edgelab_core::features::build_features;
use edgelab_core::journal::{
    close_journal, summarize, CloseOutcome, JournalError, JournalSummary, TradeJournal,
};
use edgelab_core::labeling::label_bars;
use edgelab_core::watchlist::{PlanError, Watchlist};

use crate::advisor::{advise, open_trade, Advice, AdviceError};
use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::{load_bars, LoadError, LoadOptions};
use crate::export::{
    append_evaluations, append_signal, load_backtest_results, save_manifest,
    write_backtest_results, BacktestManifest, SCHEMA_VERSION,
};
use crate::metrics::BacktestSummary;
use crate::scan::{
    check_triggers, evaluate_watchlist, scan_universe, scan_watchlist, ScanReport, TriggerStatus,
};
use crate::walk_forward::{run_walk_forward, BacktestError, BacktestRow};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
    #[error("signal error: {0}")]
    Advice(#[from] AdviceError),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("watchlist error: {0}")]
    Plan(#[from] PlanError),
    #[error("export error: {0:#}")]
    Export(anyhow::Error),
    #[error("no backtest rows in {0}; run a backtest first")]
    NoBacktest(String),
    #[error("watchlist has no symbols; set watchlist.symbols or include_crypto")]
    EmptyUniverse,
}

impl From<anyhow::Error> for RunError {
    fn from(e: anyhow::Error) -> Self {
        RunError::Export(e)
    }
}

/// Complete result of one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub rows: Vec<BacktestRow>,
    pub manifest: BacktestManifest,
}

impl BacktestRun {
    pub fn summary(&self) -> &BacktestSummary {
        &self.manifest.summary
    }
}

pub fn dataset(cfg: &PipelineConfig) -> DatasetStore {
    DatasetStore::new(cfg.data.dataset_dir.clone())
}

// ─── Backtest ───────────────────────────────────────────────────────

/// Load data, run the walk-forward backtest and write the result table
/// and manifest into the dataset directory.
pub fn run_backtest(
    cfg: &PipelineConfig,
    provider: Option<&dyn PriceProvider>,
) -> Result<BacktestRun, RunError> {
    cfg.validate()?;
    let store = dataset(cfg);
    let loaded = load_bars(&cfg.data.symbol, &store, provider, &LoadOptions::from_config(&cfg.data))?;

    let run = backtest_bars(
        cfg,
        &loaded.bars,
        &loaded.dataset_hash,
        loaded.source,
        Utc::now().naive_utc(),
    )?;

    write_backtest_results(&store.backtest_results_path(), &run.rows)?;
    save_manifest(&store.manifest_path(), &run.manifest)?;
    info!(
        run_id = %&run.manifest.run_id[..12],
        path = %store.backtest_results_path().display(),
        "backtest artifacts written"
    );
    Ok(run)
}

/// Backtest already-loaded bars. Pure apart from logging.
pub fn backtest_bars(
    cfg: &PipelineConfig,
    bars: &[Bar],
    dataset_hash: &str,
    source: DataSource,
    created_at: NaiveDateTime,
) -> Result<BacktestRun, RunError> {
    let labeled = label_bars(bars, &cfg.labeling);
    let features = build_features(&labeled);
    debug!(
        bars = bars.len(),
        labeled = labeled.len(),
        features = features.len(),
        "pipeline stages"
    );

    let rows = run_walk_forward(&features, &cfg.model, &cfg.backtest)?;
    let summary = BacktestSummary::compute(&rows);
    info!(
        symbol = %cfg.data.symbol,
        trades = summary.trades,
        sharpe_like = summary.sharpe_like,
        final_equity = summary.final_equity,
        "backtest summary"
    );

    let manifest = BacktestManifest {
        schema_version: SCHEMA_VERSION,
        run_id: cfg.run_id(dataset_hash),
        symbol: cfg.data.symbol.clone(),
        dataset_hash: dataset_hash.to_string(),
        source,
        has_synthetic: source == DataSource::Synthetic,
        created_at,
        bars: bars.len(),
        feature_rows: features.len(),
        first_test: rows.first().map(|r| r.timestamp),
        last_test: rows.last().map(|r| r.timestamp),
        summary,
        config: cfg.clone(),
    };
    Ok(BacktestRun { rows, manifest })
}

// ─── Signal + paper trades ──────────────────────────────────────────

/// Advise from the last row of the saved backtest table and append the
/// signal to the signal log.
pub fn latest_signal(cfg: &PipelineConfig, now: NaiveDateTime) -> Result<(Advice, f64), RunError> {
    let store = dataset(cfg);
    let path = store.backtest_results_path();
    let rows = load_backtest_results(&path)?;
    let last = rows
        .last()
        .ok_or_else(|| RunError::NoBacktest(path.display().to_string()))?;
    let bars = store.load_prices()?;

    let advice = advise(&cfg.data.symbol, last, &bars, &cfg.signal, &cfg.account, now)?;
    append_signal(&store.signals_log_path(), &advice.record)?;
    let spot = bars.last().map(|b| b.close).unwrap_or(advice.record.spot);
    Ok((advice, spot))
}

/// Journal an OPEN paper trade for the latest signal. A FLAT signal is
/// logged but not journaled.
pub fn open_paper_trade(
    cfg: &PipelineConfig,
    now: NaiveDateTime,
) -> Result<(Advice, Option<PaperTrade>), RunError> {
    let (advice, spot) = latest_signal(cfg, now)?;
    if advice.record.bias == Side::Flat {
        info!(ticker = %advice.record.ticker, "flat signal, no trade opened");
        return Ok((advice, None));
    }
    let trade = open_trade(&advice, spot);
    TradeJournal::new(dataset(cfg).trades_log_path()).append(&trade)?;
    info!(ticker = %trade.ticker, side = %trade.side, shares = trade.shares, "opened paper trade");
    Ok((advice, Some(trade)))
}

/// Settle OPEN journal rows against the dataset's prices.
pub fn close_paper_trades(cfg: &PipelineConfig) -> Result<CloseOutcome, RunError> {
    let store = dataset(cfg);
    let bars = store.load_prices()?;
    let journal = TradeJournal::new(store.trades_log_path());
    Ok(close_journal(&journal, &bars, cfg.closer.max_hold_days)?)
}

pub fn journal_summary(cfg: &PipelineConfig) -> Result<JournalSummary, RunError> {
    let trades = TradeJournal::new(dataset(cfg).trades_log_path()).load()?;
    Ok(summarize(&trades))
}

// ─── Watchlist ──────────────────────────────────────────────────────

/// Scan the configured universe and save the watchlist JSON.
pub fn build_watchlist(
    cfg: &PipelineConfig,
    provider: &dyn PriceProvider,
    asof: NaiveDate,
) -> Result<ScanReport, RunError> {
    let universe = scan_universe(&cfg.watchlist);
    if universe.is_empty() {
        return Err(RunError::EmptyUniverse);
    }
    let store = dataset(cfg);
    store.ensure()?;
    let report = scan_watchlist(&universe, provider, asof, cfg.watchlist.risk_dollars);
    report.watchlist.save(&store.watchlist_path())?;
    Ok(report)
}

/// Score the saved watchlist against `day` and append to the evaluation log.
pub fn evaluate_watchlist_file(
    cfg: &PipelineConfig,
    provider: &dyn PriceProvider,
    day: NaiveDate,
    now_utc: NaiveDateTime,
) -> Result<Vec<IdeaEvaluation>, RunError> {
    let store = dataset(cfg);
    let watchlist = Watchlist::load(&store.watchlist_path())?;
    let evaluations = evaluate_watchlist(&watchlist, provider, day, cfg.watchlist.same_bar_policy);
    append_evaluations(&store.eval_log_path(), day, now_utc, &evaluations)?;
    Ok(evaluations)
}

/// Compare the saved watchlist's entries with the latest prices.
pub fn watchlist_triggers(
    cfg: &PipelineConfig,
    provider: &dyn PriceProvider,
    asof: NaiveDate,
) -> Result<Vec<TriggerStatus>, RunError> {
    let watchlist = Watchlist::load(&dataset(cfg).watchlist_path())?;
    Ok(check_triggers(&watchlist, provider, asof, cfg.watchlist.buffer_bps))
}
