//! Reporting and export: backtest tables, run manifests, append-only logs.
//!
//! - **CSV**: the backtest result table (full overwrite per run), plus the
//!   append-only signal and evaluation logs
//! - **JSON**: a run manifest with schema versioning
//! - **Markdown**: a human-readable single-run report
//!
//! Manifests carry a `schema_version`. Newer versions are rejected on load.

use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use edgelab_core::data::DataSource;
use edgelab_core::evaluator::{IdeaEvaluation, Outcome};

use crate::advisor::SignalRecord;
use crate::config::PipelineConfig;
use crate::metrics::BacktestSummary;
use crate::walk_forward::BacktestRow;

/// Current manifest schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything needed to identify and reproduce one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub symbol: String,
    pub dataset_hash: String,
    pub source: DataSource,
    pub has_synthetic: bool,
    pub created_at: NaiveDateTime,
    pub bars: usize,
    pub feature_rows: usize,
    pub first_test: Option<NaiveDateTime>,
    pub last_test: Option<NaiveDateTime>,
    pub summary: BacktestSummary,
    pub config: PipelineConfig,
}

// ─── Backtest table ─────────────────────────────────────────────────

/// Serialize backtest rows as CSV text with a `datetime` column first.
pub fn export_backtest_csv(rows: &[BacktestRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if rows.is_empty() {
        wtr.write_record([
            "datetime",
            "q_lo",
            "q_md",
            "q_hi",
            "mu",
            "signal",
            "forward_return",
            "pnl",
            "equity",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Replace the result table at `path` (write to .tmp, rename into place).
pub fn write_backtest_results(path: &Path, rows: &[BacktestRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let text = export_backtest_csv(rows)?;
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, text).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))
}

/// Read a result table written by [`write_backtest_results`].
pub fn load_backtest_results(path: &Path) -> Result<Vec<BacktestRow>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    rdr.deserialize()
        .collect::<Result<Vec<BacktestRow>, _>>()
        .with_context(|| format!("malformed backtest table {}", path.display()))
}

// ─── Manifest ───────────────────────────────────────────────────────

pub fn save_manifest(path: &Path, manifest: &BacktestManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)
        .context("failed to serialize backtest manifest")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a manifest, rejecting schema versions newer than this build.
pub fn load_manifest(path: &Path) -> Result<BacktestManifest> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: BacktestManifest =
        serde_json::from_str(&json).context("failed to deserialize backtest manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Append-only logs ───────────────────────────────────────────────

/// Append serialized rows to a CSV file; the header is written only when
/// the file is new or empty.
pub fn append_csv_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut wtr = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("failed to append to {}", path.display()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn append_signal(path: &Path, record: &SignalRecord) -> Result<()> {
    append_csv_rows(path, std::slice::from_ref(record))
}

/// One row of the evaluation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalLogRow {
    pub date: NaiveDate,
    pub ts_utc: String,
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

impl EvalLogRow {
    pub fn new(date: NaiveDate, ts_utc: NaiveDateTime, e: &IdeaEvaluation) -> Self {
        Self {
            date,
            ts_utc: ts_utc.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            symbol: e.symbol.clone(),
            triggered: e.triggered,
            result: e.result,
            open: e.open,
            high: e.high,
            low: e.low,
            close: e.close,
            entry: e.entry,
            stop: e.stop,
            target: e.target,
            rr: e.rr,
        }
    }
}

pub fn append_evaluations(
    path: &Path,
    date: NaiveDate,
    ts_utc: NaiveDateTime,
    evaluations: &[IdeaEvaluation],
) -> Result<()> {
    let rows: Vec<EvalLogRow> = evaluations
        .iter()
        .map(|e| EvalLogRow::new(date, ts_utc, e))
        .collect();
    append_csv_rows(path, &rows)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Markdown report for one backtest run.
pub fn generate_report(m: &BacktestManifest) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# Backtest Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", m.symbol));
    if let (Some(a), Some(b)) = (m.first_test, m.last_test) {
        md.push_str(&format!("| Test period | {} to {} |\n", a.date(), b.date()));
    }
    md.push_str(&format!(
        "| Rows | {} bars, {} feature rows, {} test rows |\n",
        m.bars, m.feature_rows, m.summary.test_rows
    ));
    md.push_str(&format!("| Run id | {} |\n", m.run_id));
    md.push_str(&format!("| Dataset hash | {} |\n", m.dataset_hash));
    if m.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let s = &m.summary;
    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", s.trades));
    md.push_str(&format!("| Avg PnL | {:.6} |\n", s.avg_pnl));
    md.push_str(&format!("| Sharpe-like | {:.3} |\n", s.sharpe_like));
    md.push_str(&format!("| Final equity | {:.4} |\n", s.final_equity));
    md.push_str(&format!("| Total return | {:.2}% |\n", s.total_return * 100.0));
    md.push_str(&format!("| Max drawdown | {:.2}% |\n", s.max_drawdown * 100.0));
    md.push_str(&format!("| Hit rate | {:.1}% |\n", s.hit_rate * 100.0));
    md
}
