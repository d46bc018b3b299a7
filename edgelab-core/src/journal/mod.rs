//! Trade journal: CSV persistence, the OPEN → CLOSED closer and summary
//! statistics over closed trades.

pub mod closer;
pub mod store;
pub mod summary;

pub use closer::{close_journal, close_trades, CloseOutcome, DEFAULT_MAX_HOLD_DAYS};
pub use store::{TradeJournal, JOURNAL_COLUMNS};
pub use summary::{summarize, JournalSummary, SymbolStats};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal csv error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("journal I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl JournalError {
    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        JournalError::Csv {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        JournalError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
