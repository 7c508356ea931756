//! Log entry structures and the append-only log

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tables::{DirtyPageTable, TransactionTable};
use crate::types::{DisplayLsn, DisplayValue, Lsn, PageId, PageValue, TxnId};

/// A log entry. Its LSN is its position in the [`Log`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry {
    /// A page write, with the before-image for rollback
    Update {
        txn: TxnId,
        page: PageId,
        before: Option<PageValue>,
        after: PageValue,
        prev_lsn: Option<Lsn>,
    },
    /// Transaction committed
    Commit { txn: TxnId, prev_lsn: Option<Lsn> },
    /// Transaction finished (after commit, or after its rollback completed)
    End { txn: TxnId, prev_lsn: Option<Lsn> },
    /// Compensation log record written while undoing an update.
    /// `undo_next_lsn` is `None` once the transaction's first update is undone.
    Compensation {
        txn: TxnId,
        page: PageId,
        after: Option<PageValue>,
        undo_next_lsn: Option<Lsn>,
        prev_lsn: Option<Lsn>,
    },
    /// Independent copies of both tables at checkpoint time
    Checkpoint {
        dirty_pages: DirtyPageTable,
        transactions: TransactionTable,
    },
}

impl LogEntry {
    /// Short lowercase name of the entry kind
    pub fn kind(&self) -> &'static str {
        match self {
            LogEntry::Update { .. } => "update",
            LogEntry::Commit { .. } => "commit",
            LogEntry::End { .. } => "end",
            LogEntry::Compensation { .. } => "compensation",
            LogEntry::Checkpoint { .. } => "checkpoint",
        }
    }

    /// The transaction that wrote this entry (checkpoints have none)
    pub fn txn(&self) -> Option<&TxnId> {
        match self {
            LogEntry::Update { txn, .. }
            | LogEntry::Commit { txn, .. }
            | LogEntry::End { txn, .. }
            | LogEntry::Compensation { txn, .. } => Some(txn),
            LogEntry::Checkpoint { .. } => None,
        }
    }

    /// The page this entry modifies, if any
    pub fn page(&self) -> Option<&PageId> {
        match self {
            LogEntry::Update { page, .. } | LogEntry::Compensation { page, .. } => Some(page),
            _ => None,
        }
    }

    pub fn prev_lsn(&self) -> Option<Lsn> {
        match self {
            LogEntry::Update { prev_lsn, .. }
            | LogEntry::Commit { prev_lsn, .. }
            | LogEntry::End { prev_lsn, .. }
            | LogEntry::Compensation { prev_lsn, .. } => *prev_lsn,
            LogEntry::Checkpoint { .. } => None,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Update {
                txn,
                page,
                before,
                after,
                prev_lsn,
            } => write!(
                f,
                "UPDATE T{} {}: {} -> {} (prev {})",
                txn,
                page,
                DisplayValue(before),
                after,
                DisplayLsn(*prev_lsn)
            ),
            LogEntry::Commit { txn, prev_lsn } => {
                write!(f, "COMMIT T{} (prev {})", txn, DisplayLsn(*prev_lsn))
            }
            LogEntry::End { txn, prev_lsn } => {
                write!(f, "END T{} (prev {})", txn, DisplayLsn(*prev_lsn))
            }
            LogEntry::Compensation {
                txn,
                page,
                after,
                undo_next_lsn,
                prev_lsn,
            } => write!(
                f,
                "CLR T{} {}: -> {} (undo next {}, prev {})",
                txn,
                page,
                DisplayValue(after),
                DisplayLsn(*undo_next_lsn),
                DisplayLsn(*prev_lsn)
            ),
            LogEntry::Checkpoint {
                dirty_pages,
                transactions,
            } => write!(
                f,
                "CHECKPOINT ({} dirty pages, {} transactions)",
                dirty_pages.len(),
                transactions.len()
            ),
        }
    }
}

/// The append-only log. Entries are never mutated once written; the only way
/// to shorten the log is losing its non-durable suffix in a crash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    entries: Vec<LogEntry>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// LSN the next appended entry will get
    pub fn next_lsn(&self) -> Lsn {
        self.entries.len() as Lsn
    }

    /// Append an entry and return its LSN
    pub fn append(&mut self, entry: LogEntry) -> Lsn {
        let lsn = self.next_lsn();
        self.entries.push(entry);
        lsn
    }

    pub fn get(&self, lsn: Lsn) -> Option<&LogEntry> {
        usize::try_from(lsn).ok().and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Drop every entry at or after `len`
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// LSN of the most recent checkpoint entry
    pub fn last_checkpoint(&self) -> Option<Lsn> {
        self.entries
            .iter()
            .rposition(|entry| matches!(entry, LogEntry::Checkpoint { .. }))
            .map(|i| i as Lsn)
    }
}
