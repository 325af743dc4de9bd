use chatlog_core::TransportError;
use storage::StorageError;
use thiserror::Error;

use crate::backfill::BackfillReport;

/// A single message failed to ingest. Absorbed by callers and reflected in counters/logs.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),
}

/// Failures that end a backfill call. Anything else is absorbed into the report counters.
#[derive(Error, Debug)]
pub enum BackfillError {
    /// Target chat not found or not accessible; nothing was written.
    #[error("Chat not found: {target} ({reason})")]
    NotFound {
        target: String,
        reason: TransportError,
    },

    #[error("Backfill already running for chat {chat_id}")]
    AlreadyRunning { chat_id: i64 },

    /// History became unreadable mid-walk; already ingested messages remain stored.
    #[error("No access to history of chat {}: {reason}", report.chat_id)]
    PermissionDenied {
        reason: String,
        report: BackfillReport,
    },

    /// Non-recoverable transport failure mid-walk; partial progress remains stored.
    #[error("Backfill of chat {} interrupted: {reason}", report.chat_id)]
    Interrupted {
        reason: TransportError,
        report: BackfillReport,
    },
}

impl BackfillError {
    /// Counters of the partial walk, when the walk had started.
    pub fn partial_report(&self) -> Option<&BackfillReport> {
        match self {
            BackfillError::PermissionDenied { report, .. }
            | BackfillError::Interrupted { report, .. } => Some(report),
            BackfillError::NotFound { .. } | BackfillError::AlreadyRunning { .. } => None,
        }
    }
}
