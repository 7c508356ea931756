//! Error types for the simulator
//!
//! Fatal model violations are kept apart from parse and I/O failures so a host
//! can report exactly which invariant broke and where. Expected no-op branches
//! (flushing a clean page, redo skips) are never errors.

use std::fmt;
use std::io;

use crate::types::{Lsn, PageId, Phase};

/// A broken write-ahead-logging or single-crash assumption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A page id was used that was never provisioned on disk
    UnprovisionedPage(PageId),
    /// Flush of a page that is not resident but still listed as dirty
    DirtyPageNotResident(PageId),
    /// A log entry kind this phase must never see (e.g. a CLR during analysis)
    UnexpectedRecord(&'static str),
    /// A checkpoint that is not the first entry scanned, or arrives over
    /// non-empty volatile state
    MisplacedCheckpoint,
    /// The entry at a loser LSN is not an update
    NotAnUpdate(&'static str),
    /// An LSN points past the end of the log
    MissingEntry(Lsn),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnprovisionedPage(page) => {
                write!(f, "page '{}' was never provisioned on disk", page)
            }
            Violation::DirtyPageNotResident(page) => write!(
                f,
                "page '{}' is in the dirty page table but not in the buffer pool",
                page
            ),
            Violation::UnexpectedRecord(kind) => {
                write!(f, "unexpected {} record", kind)
            }
            Violation::MisplacedCheckpoint => write!(
                f,
                "checkpoint must be the first entry scanned over empty volatile state"
            ),
            Violation::NotAnUpdate(kind) => {
                write!(f, "loser LSN points at a {} record, expected an update", kind)
            }
            Violation::MissingEntry(lsn) => write!(f, "no log entry at LSN {}", lsn),
        }
    }
}

/// Unified error type for simulator operations
#[derive(Debug)]
pub enum AriesError {
    /// Fatal model violation. `position` is the operation index during
    /// forward processing and the LSN being examined during recovery.
    Invariant {
        phase: Phase,
        position: u64,
        violation: Violation,
    },
    /// Operation-language syntax error
    Syntax(String),
    /// I/O error (trace files)
    Io(io::Error),
    /// Trace serialization error (JSON or binary)
    Encoding(String),
}

impl AriesError {
    pub fn invariant(phase: Phase, position: u64, violation: Violation) -> Self {
        AriesError::Invariant {
            phase,
            position,
            violation,
        }
    }

    /// The violated invariant, if this is a model error
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            AriesError::Invariant { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

impl fmt::Display for AriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AriesError::Invariant {
                phase: Phase::Normal,
                position,
                violation,
            } => write!(f, "invariant violated at operation {}: {}", position, violation),
            AriesError::Invariant {
                phase,
                position,
                violation,
            } => write!(
                f,
                "invariant violated during {} at LSN {}: {}",
                phase, position, violation
            ),
            AriesError::Syntax(msg) => write!(f, "syntax error: {}", msg),
            AriesError::Io(e) => write!(f, "{}", e),
            AriesError::Encoding(msg) => write!(f, "encoding error: {}", msg),
        }
    }
}

impl std::error::Error for AriesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AriesError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for AriesError {
    fn from(e: io::Error) -> Self {
        AriesError::Io(e)
    }
}

impl From<serde_json::Error> for AriesError {
    fn from(e: serde_json::Error) -> Self {
        AriesError::Encoding(e.to_string())
    }
}

impl From<bincode::Error> for AriesError {
    fn from(e: bincode::Error) -> Self {
        AriesError::Encoding(e.to_string())
    }
}

impl From<tempfile::PersistError> for AriesError {
    fn from(e: tempfile::PersistError) -> Self {
        AriesError::Io(e.error)
    }
}

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, AriesError>;
