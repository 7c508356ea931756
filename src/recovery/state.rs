//! Working state threaded through every phase

use super::log::Log;
use super::pages::PageStore;
use super::tables::{DirtyPageTable, TransactionTable};
use crate::error::{AriesError, Result, Violation};
use crate::parser::Operation;
use crate::types::{Cursor, Lsn, Page, PageId, Phase};

/// Complete simulator state at one point in time.
///
/// Phase functions take a `State` by value, mutate it one step at a time and
/// record each step in the [`History`](super::history::History).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub phase: Phase,
    pub log: Log,
    pub transactions: TransactionTable,
    pub dirty_pages: DirtyPageTable,
    pub pages: PageStore,
    /// Number of log entries forced to durable storage
    pub durable: usize,
    /// Position of the step currently executing
    pub cursor: Option<Cursor>,
    /// Narration for the current step
    pub notes: Vec<String>,
    narrate: bool,
}

impl State {
    pub fn new(pages: PageStore, narrate: bool) -> Self {
        Self {
            phase: Phase::Normal,
            log: Log::new(),
            transactions: TransactionTable::new(),
            dirty_pages: DirtyPageTable::new(),
            pages,
            durable: 0,
            cursor: None,
            notes: Vec::new(),
            narrate,
        }
    }

    /// Fresh state with every page referenced by `operations` provisioned
    pub fn for_operations(operations: &[Operation], narrate: bool) -> Self {
        let pages = operations
            .iter()
            .filter_map(Operation::page)
            .map(PageId::from);
        Self::new(PageStore::provisioned(pages), narrate)
    }

    /// Start a new step: move the cursor and drop the previous step's notes
    pub fn begin_step(&mut self, cursor: Option<Cursor>) {
        self.cursor = cursor;
        self.notes.clear();
    }

    /// Attach a narration line to the current step. The closure only runs
    /// when narration is enabled.
    pub fn note(&mut self, describe: impl FnOnce() -> String) {
        if self.narrate {
            self.notes.push(describe());
        }
    }

    /// Force the log durable up to and including `lsn`
    pub fn force(&mut self, lsn: Lsn) {
        let through = lsn as usize + 1;
        if through > self.durable {
            log::debug!("forcing log through LSN {} (durable {} -> {})", lsn, self.durable, through);
            self.note(|| format!("log forced through LSN {}", lsn));
            self.durable = through;
        }
    }

    /// True if the transaction table, dirty page table and buffer pool are
    /// all empty
    pub fn volatile_is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.dirty_pages.is_empty()
            && self.pages.buffer_pool().is_empty()
    }

    /// Pin `page`, reporting an unprovisioned page at the current position
    pub fn pin(&mut self, page: &str) -> Result<&mut Page> {
        let phase = self.phase;
        let position = self.position();
        self.pages
            .pin(page)
            .map_err(|violation| AriesError::invariant(phase, position, violation))
    }

    /// Build a fatal error for `violation` at the current position
    pub fn fail(&self, violation: Violation) -> AriesError {
        log::debug!("{} step at {} failed: {}", self.phase, self.position(), violation);
        AriesError::invariant(self.phase, self.position(), violation)
    }

    fn position(&self) -> u64 {
        match self.cursor {
            Some(Cursor::Operation(index)) => index as u64,
            Some(Cursor::Entry(lsn)) => lsn,
            None => self.log.next_lsn(),
        }
    }
}
