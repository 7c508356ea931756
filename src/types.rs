//! Core types for the recovery simulator
//!
//! Defines identifiers, pages, transaction states and the recovery phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Log Sequence Number - position of an entry in the log
pub type Lsn = u64;

/// Transaction identifier as written in the operation language (`W_<txn>`)
pub type TxnId = String;

/// Page identifier as written in the operation language
pub type PageId = String;

/// A page value. The operation language only produces alphanumeric tokens.
pub type PageValue = String;

/// A page record.
///
/// Both fields use `None` as the sentinel of a page that has never been
/// written. `None` sorts before any `Some`, so a sentinel page LSN compares
/// lower than every real LSN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// LSN of the last log entry that modified this copy of the page
    pub page_lsn: Option<Lsn>,
    /// Current contents
    pub value: Option<PageValue>,
}

impl Page {
    /// The page every provisioned id starts with
    pub fn sentinel() -> Self {
        Self::default()
    }

    pub fn new(page_lsn: Lsn, value: Option<PageValue>) -> Self {
        Self {
            page_lsn: Some(page_lsn),
            value,
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[pageLSN {}] {}", DisplayLsn(self.page_lsn), DisplayValue(&self.value))
    }
}

/// Formats an optional LSN, rendering the sentinel as `-`
pub struct DisplayLsn(pub Option<Lsn>);

impl fmt::Display for DisplayLsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(lsn) => write!(f, "{}", lsn),
            None => write!(f, "-"),
        }
    }
}

/// Formats an optional page value, rendering the sentinel as `-`
pub struct DisplayValue<'a>(pub &'a Option<PageValue>);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "-"),
        }
    }
}

/// Transaction status as tracked by the transaction table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    InProgress,
    Committed,
    Aborted,
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnStatus::InProgress => write!(f, "in progress"),
            TxnStatus::Committed => write!(f, "committed"),
            TxnStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Simulation phase.
///
/// A run moves through these strictly in declaration order, once each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Forward processing of the operation schedule
    Normal,
    /// Volatile state has just been lost
    Crashed,
    Analysis,
    Redo,
    Undo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Normal => write!(f, "Normal"),
            Phase::Crashed => write!(f, "Crashed"),
            Phase::Analysis => write!(f, "Analysis"),
            Phase::Redo => write!(f, "Redo"),
            Phase::Undo => write!(f, "Undo"),
        }
    }
}

impl Phase {
    /// Check if this phase belongs to crash recovery
    pub fn is_recovery(&self) -> bool {
        matches!(self, Phase::Analysis | Phase::Redo | Phase::Undo)
    }
}

/// Scan-position marker for the step a snapshot records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    /// Index into the operation schedule (forward processing)
    Operation(usize),
    /// LSN of the log entry being examined (recovery)
    Entry(Lsn),
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Operation(index) => write!(f, "op #{}", index),
            Cursor::Entry(lsn) => write!(f, "LSN {}", lsn),
        }
    }
}
