//! EdgeLab CLI: backtest, signal, paper-trade and watchlist commands.
//!
//! Commands:
//! - `backtest`: load prices, run the walk-forward backtest, write artifacts
//! - `signal`: advise from the last backtest row and log it
//! - `open-trade` / `close-trades` / `summary`: the paper-trade journal loop
//! - `watchlist` / `evaluate` / `triggers`: daily ATR plans and their scoring
//! - `sample-data`: write a seeded synthetic price CSV

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use edgelab_core::data::{
    random_walk_bars, write_price_csv, CsvProvider, PriceProvider, SyntheticProvider,
    YahooProvider,
};
use edgelab_core::journal::JournalSummary;
use edgelab_runner::advisor::Advice;
use edgelab_runner::export::generate_report;
use edgelab_runner::runner::{
    build_watchlist, close_paper_trades, dataset, evaluate_watchlist_file, journal_summary,
    latest_signal, open_paper_trade, run_backtest, watchlist_triggers,
};
use edgelab_runner::{BacktestRun, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "edgelab",
    about = "EdgeLab CLI: quantile-forecast research and paper trading"
)]
struct Cli {
    /// Path to a TOML pipeline config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the dataset directory.
    #[arg(long, global = true)]
    dataset_dir: Option<PathBuf>,

    /// Override the traded symbol.
    #[arg(long, global = true)]
    symbol: Option<String>,

    /// Never touch the network.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Debug-level logging (RUST_LOG still wins when set).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the walk-forward backtest and write the result table and manifest.
    Backtest {
        /// Start date (YYYY-MM-DD). Defaults to two years before the end.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Fall back to a seeded synthetic series when no data is available.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Read `{SYMBOL}.csv` files from this directory instead of Yahoo.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Print the markdown report instead of the short summary.
        #[arg(long, default_value_t = false)]
        report: bool,
    },
    /// Advise from the latest backtest row and append it to the signal log.
    Signal {
        /// Print the signal record as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Journal an OPEN paper trade for the latest signal.
    OpenTrade,
    /// Settle OPEN paper trades against the dataset's prices.
    CloseTrades,
    /// Summarize the paper-trade journal.
    Summary,
    /// Scan symbols and save today's ATR watchlist.
    Watchlist {
        /// Symbols to scan. Defaults to `watchlist.symbols` from the config.
        symbols: Vec<String>,

        /// Skip the built-in crypto list.
        #[arg(long, default_value_t = false)]
        no_crypto: bool,

        /// Plan as of this date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        asof: Option<String>,
    },
    /// Score the saved watchlist against a day's bars and log the results.
    Evaluate {
        /// Day to score (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        day: Option<String>,
    },
    /// Check the saved watchlist's entries against the latest prices.
    Triggers {
        /// Price date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        asof: Option<String>,
    },
    /// Write a seeded synthetic `{SYMBOL}.csv` for use with `backtest --csv-dir`.
    SampleData {
        /// Output directory. Defaults to the dataset directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of business-day bars.
        #[arg(long, default_value_t = 750)]
        bars: usize,

        /// First date (YYYY-MM-DD).
        #[arg(long, default_value = "2022-01-03")]
        start: String,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.dataset_dir {
        cfg.data.dataset_dir = dir.clone();
    }
    if let Some(symbol) = &cli.symbol {
        cfg.data.symbol = symbol.trim().to_uppercase();
    }
    if cli.offline {
        cfg.data.offline = true;
    }

    match cli.command {
        Commands::Backtest {
            start,
            end,
            synthetic,
            csv_dir,
            report,
        } => run_backtest_cmd(cfg, start, end, synthetic, csv_dir, report),
        Commands::Signal { json } => run_signal(&cfg, json),
        Commands::OpenTrade => run_open_trade(&cfg),
        Commands::CloseTrades => run_close_trades(&cfg),
        Commands::Summary => run_summary(&cfg),
        Commands::Watchlist {
            symbols,
            no_crypto,
            asof,
        } => run_watchlist(cfg, symbols, no_crypto, asof),
        Commands::Evaluate { day } => run_evaluate(&cfg, day),
        Commands::Triggers { asof } => run_triggers(&cfg, asof),
        Commands::SampleData {
            out,
            bars,
            start,
            seed,
        } => run_sample_data(&cfg, out, bars, &start, seed),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn date_or_today(s: Option<String>) -> Result<NaiveDate> {
    match s {
        Some(s) => parse_date(&s),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Live price source for commands that always need one.
fn network_provider(cfg: &PipelineConfig) -> Result<Box<dyn PriceProvider>> {
    if cfg.data.offline {
        bail!("this command fetches live prices; drop --offline");
    }
    Ok(Box::new(
        YahooProvider::new().context("failed to create Yahoo provider")?,
    ))
}

// ─── Backtest ───────────────────────────────────────────────────────

fn run_backtest_cmd(
    mut cfg: PipelineConfig,
    start: Option<String>,
    end: Option<String>,
    synthetic: bool,
    csv_dir: Option<PathBuf>,
    report: bool,
) -> Result<()> {
    if let Some(s) = start {
        cfg.data.start = Some(parse_date(&s)?);
    }
    if let Some(s) = end {
        cfg.data.end = Some(parse_date(&s)?);
    }
    if synthetic {
        cfg.data.synthetic = true;
    }

    let provider: Option<Box<dyn PriceProvider>> = match csv_dir {
        Some(dir) => Some(Box::new(CsvProvider::new(dir))),
        None if cfg.data.offline || cfg.data.synthetic => None,
        None => Some(Box::new(
            YahooProvider::new().context("failed to create Yahoo provider")?,
        )),
    };

    let run = run_backtest(&cfg, provider.as_deref())
        .with_context(|| format!("backtest failed for {}", cfg.data.symbol))?;

    if report {
        println!("{}", generate_report(&run.manifest));
    } else {
        print_backtest(&run);
    }
    Ok(())
}

fn print_backtest(run: &BacktestRun) {
    let m = &run.manifest;
    let s = run.summary();
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", m.symbol);
    println!("Run:            {}", &m.run_id[..12]);
    if let (Some(first), Some(last)) = (m.first_test, m.last_test) {
        println!("Test period:    {} to {}", first.date(), last.date());
    }
    println!(
        "Rows:           {} bars, {} features, {} tested",
        m.bars, m.feature_rows, s.test_rows
    );
    println!("Trades:         {}", s.trades);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", s.total_return * 100.0);
    println!("Final Equity:   {:.4}", s.final_equity);
    println!("Sharpe (like):  {:.3}", s.sharpe_like);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown * 100.0);
    println!("Hit Rate:       {:.1}%", s.hit_rate * 100.0);
    println!("Avg PnL/row:    {:.6}", s.avg_pnl);
    if m.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}

// ─── Signal + paper trades ──────────────────────────────────────────

fn run_signal(cfg: &PipelineConfig, json: bool) -> Result<()> {
    let (advice, _) = latest_signal(cfg, Utc::now().naive_utc()).context("signal failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&advice.record)?);
    } else {
        print_advice(&advice);
    }
    Ok(())
}

fn print_advice(advice: &Advice) {
    let r = &advice.record;
    println!();
    println!("=== {} {} ===", r.ticker, r.bias);
    println!("Spot:           {:.2}", r.spot);
    println!(
        "Quantiles:      lo {:+.4}  md {:+.4}  hi {:+.4}",
        r.q_lo, r.q_md, r.q_hi
    );
    println!("Sigma:          {:.4}", r.sigma);
    println!("Target / Stop:  {:.2} / {:.2}", r.tp_spot, r.sl_spot);
    println!(
        "Shares:         {} (risk/share {:.2}, max loss {:.2})",
        r.shares, r.risk_per_share, r.max_loss
    );
    println!(
        "Options:        {} contracts (max spend {:.2})",
        r.contracts, r.max_spend
    );
    if let Some(hint) = &advice.suggestion.option {
        println!(
            "Option hint:    {:?} ~{:.2} delta, >= {} days",
            hint.right, hint.delta, advice.suggestion.horizon_days_min
        );
    }
}

fn run_open_trade(cfg: &PipelineConfig) -> Result<()> {
    let (advice, trade) =
        open_paper_trade(cfg, Utc::now().naive_utc()).context("failed to open paper trade")?;
    print_advice(&advice);
    match trade {
        Some(t) => println!(
            "\nJournaled {} {} x{} @ {:.4}",
            t.side, t.ticker, t.shares, t.entry_spot
        ),
        None => println!("\nFLAT signal: nothing journaled"),
    }
    Ok(())
}

fn run_close_trades(cfg: &PipelineConfig) -> Result<()> {
    let outcome = close_paper_trades(cfg).context("failed to close paper trades")?;
    println!(
        "Closed {} trade(s); {} still open",
        outcome.closed, outcome.open_remaining
    );
    Ok(())
}

fn run_summary(cfg: &PipelineConfig) -> Result<()> {
    let summary = journal_summary(cfg).context("failed to summarize journal")?;
    print_journal(&summary);
    Ok(())
}

fn print_journal(s: &JournalSummary) {
    println!();
    println!("=== Paper Trades ===");
    println!(
        "Closed:         {} ({} wins, {} losses), {} open",
        s.trades, s.wins, s.losses, s.open
    );
    if s.trades == 0 {
        return;
    }
    println!("Win Rate:       {:.1}%", s.win_rate_pct);
    println!("Net PnL:        {:.2}", s.net_pnl);
    println!("Avg PnL:        {:.2}", s.avg_pnl);
    println!("Best / Worst:   {:.2} / {:.2}", s.best, s.worst);
    if let Some(days) = s.avg_hold_days {
        println!("Avg Hold:       {days:.1} days");
    }
    if !s.per_ticker.is_empty() {
        println!();
        println!(
            "{:<10} {:>6} {:>8} {:>10} {:>10}",
            "Ticker", "Trades", "Win %", "Net PnL", "Avg PnL"
        );
        for t in &s.per_ticker {
            println!(
                "{:<10} {:>6} {:>8.1} {:>10.2} {:>10.2}",
                t.ticker, t.trades, t.win_rate_pct, t.net_pnl, t.avg_pnl
            );
        }
    }
}

// ─── Watchlist ──────────────────────────────────────────────────────

fn run_watchlist(
    mut cfg: PipelineConfig,
    symbols: Vec<String>,
    no_crypto: bool,
    asof: Option<String>,
) -> Result<()> {
    if !symbols.is_empty() {
        cfg.watchlist.symbols = symbols;
    }
    if no_crypto {
        cfg.watchlist.include_crypto = false;
    }
    let asof = date_or_today(asof)?;
    let provider: Box<dyn PriceProvider> = if cfg.data.offline {
        Box::new(SyntheticProvider)
    } else {
        network_provider(&cfg)?
    };

    let report = build_watchlist(&cfg, provider.as_ref(), asof).context("watchlist scan failed")?;
    println!(
        "{:<10} {:>7} {:>12} {:>12} {:>12} {:>8} {:>6}",
        "Symbol", "Asset", "Entry", "Stop", "Target", "Units", "RSI"
    );
    for idea in &report.watchlist.ideas {
        println!(
            "{:<10} {:>7} {:>12} {:>12} {:>12} {:>8} {:>6.1}",
            idea.symbol,
            format!("{:?}", idea.asset_class).to_lowercase(),
            idea.entry,
            idea.stop,
            idea.target,
            idea.units,
            idea.rsi
        );
    }
    for f in &report.failures {
        println!("SKIPPED {}: {}", f.symbol, f.reason);
    }
    println!(
        "\nSaved {} idea(s) to {}",
        report.watchlist.ideas.len(),
        dataset(&cfg).watchlist_path().display()
    );
    Ok(())
}

fn run_evaluate(cfg: &PipelineConfig, day: Option<String>) -> Result<()> {
    let day = date_or_today(day)?;
    let provider = network_provider(cfg)?;
    let evals = evaluate_watchlist_file(cfg, provider.as_ref(), day, Utc::now().naive_utc())
        .context("watchlist evaluation failed")?;
    println!(
        "{:<10} {:>9} {:>10} {:>10} {:>6}",
        "Symbol", "Triggered", "Result", "Close", "R:R"
    );
    for e in &evals {
        let close = e.close.map_or_else(|| "-".to_string(), |c| format!("{c:.2}"));
        println!(
            "{:<10} {:>9} {:>10} {:>10} {:>6.2}",
            e.symbol,
            e.triggered,
            e.result.as_str(),
            close,
            e.rr
        );
    }
    Ok(())
}

fn run_triggers(cfg: &PipelineConfig, asof: Option<String>) -> Result<()> {
    let asof = date_or_today(asof)?;
    let provider = network_provider(cfg)?;
    let status =
        watchlist_triggers(cfg, provider.as_ref(), asof).context("trigger check failed")?;
    for s in &status {
        let last = s.last.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        let flag = if s.triggered { "TRIGGERED" } else { "" };
        println!("{:<10} entry {:>10.2} last {:>10} {flag}", s.symbol, s.entry, last);
    }
    Ok(())
}

// ─── Sample data ────────────────────────────────────────────────────

fn run_sample_data(
    cfg: &PipelineConfig,
    out: Option<PathBuf>,
    n: usize,
    start: &str,
    seed: u64,
) -> Result<()> {
    if n == 0 {
        bail!("--bars must be positive");
    }
    let start = parse_date(start)?;
    let dir = out.unwrap_or_else(|| cfg.data.dataset_dir.clone());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let bars = random_walk_bars(start, n, seed);
    let path = dir.join(format!("{}.csv", cfg.data.symbol));
    write_price_csv(&path, &bars)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {} synthetic bars to {}", bars.len(), path.display());
    println!(
        "Backtest them with: edgelab --symbol {} backtest --csv-dir {}",
        cfg.data.symbol,
        dir.display()
    );
    Ok(())
}
