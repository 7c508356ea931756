//! Operation schedule AST

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{PageId, PageValue, TxnId};

/// One operation of a transaction schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// `W_<txn>(<page>,<value>)`
    Write {
        txn: TxnId,
        page: PageId,
        value: PageValue,
    },
    /// `Commit_<txn>()`
    Commit { txn: TxnId },
    /// `Flush(<page>)`
    Flush { page: PageId },
    /// `Checkpoint()`
    Checkpoint,
}

impl Operation {
    /// The page this operation refers to, if any
    pub fn page(&self) -> Option<&str> {
        match self {
            Operation::Write { page, .. } | Operation::Flush { page } => Some(page),
            Operation::Commit { .. } | Operation::Checkpoint => None,
        }
    }

    /// The transaction issuing this operation, if any
    pub fn txn(&self) -> Option<&str> {
        match self {
            Operation::Write { txn, .. } | Operation::Commit { txn } => Some(txn),
            Operation::Flush { .. } | Operation::Checkpoint => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Write { txn, page, value } => write!(f, "W_{}({},{})", txn, page, value),
            Operation::Commit { txn } => write!(f, "Commit_{}()", txn),
            Operation::Flush { page } => write!(f, "Flush({})", page),
            Operation::Checkpoint => write!(f, "Checkpoint()"),
        }
    }
}

/// Render a schedule back into the operation language
pub fn render(operations: &[Operation]) -> String {
    operations
        .iter()
        .map(|op| op.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
