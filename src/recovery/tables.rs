//! Transaction table and dirty page table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Lsn, PageId, TxnId, TxnStatus};

/// Transaction table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnEntry {
    pub status: TxnStatus,
    /// LSN of the most recent log entry written by the transaction
    pub last_lsn: Lsn,
}

/// Active (or mid-recovery) transactions, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTable {
    entries: BTreeMap<TxnId, TxnEntry>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, txn: &str) -> Option<&TxnEntry> {
        self.entries.get(txn)
    }

    pub fn last_lsn(&self, txn: &str) -> Option<Lsn> {
        self.entries.get(txn).map(|entry| entry.last_lsn)
    }

    /// Record that `txn` wrote the entry at `lsn`, registering it as in
    /// progress if it is not in the table yet. Returns true if it was added.
    pub fn touch(&mut self, txn: &str, lsn: Lsn) -> bool {
        match self.entries.get_mut(txn) {
            Some(entry) => {
                entry.last_lsn = lsn;
                false
            }
            None => {
                self.entries.insert(
                    txn.to_string(),
                    TxnEntry {
                        status: TxnStatus::InProgress,
                        last_lsn: lsn,
                    },
                );
                true
            }
        }
    }

    pub fn set_status(&mut self, txn: &str, status: TxnStatus) {
        if let Some(entry) = self.entries.get_mut(txn) {
            entry.status = status;
        }
    }

    pub fn remove(&mut self, txn: &str) -> Option<TxnEntry> {
        self.entries.remove(txn)
    }

    /// Mark every in-progress transaction aborted and return their ids
    pub fn abort_in_progress(&mut self) -> Vec<TxnId> {
        let mut losers = Vec::new();
        for (txn, entry) in self.entries.iter_mut() {
            if entry.status == TxnStatus::InProgress {
                entry.status = TxnStatus::Aborted;
                losers.push(txn.clone());
            }
        }
        losers
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TxnId, &TxnEntry)> {
        self.entries.iter()
    }

    pub fn contains(&self, txn: &str) -> bool {
        self.entries.contains_key(txn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Dirty page table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyPageEntry {
    /// Oldest LSN that dirtied the page since its last flush
    pub rec_lsn: Lsn,
}

/// Pages modified in the buffer pool but not yet flushed, keyed by page id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyPageTable {
    entries: BTreeMap<PageId, DirtyPageEntry>,
}

impl DirtyPageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `page` with `rec_lsn` unless it is already dirty. An existing
    /// rec_lsn is never moved. Returns true if the page was added.
    pub fn mark_dirty(&mut self, page: &str, rec_lsn: Lsn) -> bool {
        if self.entries.contains_key(page) {
            return false;
        }
        self.entries
            .insert(page.to_string(), DirtyPageEntry { rec_lsn });
        true
    }

    pub fn rec_lsn(&self, page: &str) -> Option<Lsn> {
        self.entries.get(page).map(|entry| entry.rec_lsn)
    }

    /// The LSN redo has to start from
    pub fn min_rec_lsn(&self) -> Option<Lsn> {
        self.entries.values().map(|entry| entry.rec_lsn).min()
    }

    pub fn remove(&mut self, page: &str) -> Option<DirtyPageEntry> {
        self.entries.remove(page)
    }

    pub fn contains(&self, page: &str) -> bool {
        self.entries.contains_key(page)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PageId, &DirtyPageEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
