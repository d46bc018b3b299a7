//! CSV-backed trade journal.
//!
//! New trades are appended as OPEN rows (the header is written when the file
//! is created). The closer reads the whole table and rewrites it in one pass;
//! only one writer may touch a journal at a time.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::JournalError;
use crate::domain::PaperTrade;

/// Column order of the journal file.
pub const JOURNAL_COLUMNS: [&str; 15] = [
    "ts",
    "ticker",
    "side",
    "entry_spot",
    "tp_spot",
    "sl_spot",
    "shares",
    "contracts",
    "risk_per_share",
    "max_loss",
    "status",
    "close_ts",
    "close_spot",
    "reason",
    "realized_pnl",
];

#[derive(Debug, Clone)]
pub struct TradeJournal {
    path: PathBuf,
}

impl TradeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one trade, creating the file (with header) if needed.
    pub fn append(&self, trade: &PaperTrade) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| JournalError::io(parent, e))?;
        }
        let is_new = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| JournalError::io(&self.path, e))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        wtr.serialize(trade)
            .map_err(|e| JournalError::csv(&self.path, e))?;
        wtr.flush().map_err(|e| JournalError::io(&self.path, e))?;
        debug!(ticker = %trade.ticker, side = %trade.side, "journaled open trade");
        Ok(())
    }

    /// Read every trade. A missing file is an empty journal.
    pub fn load(&self) -> Result<Vec<PaperTrade>, JournalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| JournalError::csv(&self.path, e))?;
        rdr.deserialize()
            .collect::<Result<Vec<PaperTrade>, _>>()
            .map_err(|e| JournalError::csv(&self.path, e))
    }

    /// Replace the whole journal (write to a temp file, then rename).
    pub fn save(&self, trades: &[PaperTrade]) -> Result<(), JournalError> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp).map_err(|e| JournalError::csv(&tmp, e))?;
            if trades.is_empty() {
                wtr.write_record(JOURNAL_COLUMNS)
                    .map_err(|e| JournalError::csv(&tmp, e))?;
            }
            for t in trades {
                wtr.serialize(t).map_err(|e| JournalError::csv(&tmp, e))?;
            }
            wtr.flush().map_err(|e| JournalError::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| JournalError::io(&self.path, e))
    }
}
