//! Forward processing of the operation schedule
//!
//! Operations are applied one at a time in input order. Every write is logged
//! before the page changes become durable:
//! 1. WRITE: log an update with the before-image, change the buffered page
//! 2. COMMIT: log commit and end, force the log through the end record
//! 3. FLUSH: force the log through the page's pageLSN, then write the page
//! 4. CHECKPOINT: log copies of the dirty page and transaction tables

use super::history::History;
use super::log::LogEntry;
use super::state::State;
use crate::error::{Result, Violation};
use crate::parser::Operation;
use crate::types::{Cursor, DisplayValue, Page, Phase};

/// Apply every operation, recording one snapshot per operation
pub fn run(mut state: State, operations: &[Operation], history: &mut History) -> Result<State> {
    state.phase = Phase::Normal;
    log::info!("Forward processing {} operations", operations.len());

    for (index, op) in operations.iter().enumerate() {
        state.begin_step(Some(Cursor::Operation(index)));
        apply(&mut state, op)?;
        history.record(&state);
    }

    log::info!(
        "Forward processing complete. Log length: {}, durable: {}",
        state.log.len(),
        state.durable
    );
    Ok(state)
}

/// Apply a single operation
pub fn apply(state: &mut State, op: &Operation) -> Result<()> {
    log::debug!("applying {}", op);
    match op {
        Operation::Write { txn, page, value } => write(state, txn, page, value),
        Operation::Commit { txn } => {
            commit(state, txn);
            Ok(())
        }
        Operation::Flush { page } => flush(state, page),
        Operation::Checkpoint => {
            checkpoint(state);
            Ok(())
        }
    }
}

fn write(state: &mut State, txn: &str, page: &str, value: &str) -> Result<()> {
    let lsn = state.log.next_lsn();
    let prev_lsn = state.transactions.last_lsn(txn);

    let buffered = state.pin(page)?;
    let before = std::mem::replace(buffered, Page::new(lsn, Some(value.to_string()))).value;

    state.note(|| {
        format!(
            "T{} wrote {}: {} -> {} at LSN {}",
            txn,
            page,
            DisplayValue(&before),
            value,
            lsn
        )
    });

    if state.dirty_pages.mark_dirty(page, lsn) {
        state.note(|| format!("{} entered the dirty page table with recLSN {}", page, lsn));
    }
    if state.transactions.touch(txn, lsn) {
        state.note(|| format!("T{} entered the transaction table", txn));
    }

    state.log.append(LogEntry::Update {
        txn: txn.to_string(),
        page: page.to_string(),
        before,
        after: value.to_string(),
        prev_lsn,
    });
    Ok(())
}

fn commit(state: &mut State, txn: &str) {
    let prev_lsn = state.transactions.last_lsn(txn);
    let commit_lsn = state.log.append(LogEntry::Commit {
        txn: txn.to_string(),
        prev_lsn,
    });
    let end_lsn = state.log.append(LogEntry::End {
        txn: txn.to_string(),
        prev_lsn: Some(commit_lsn),
    });
    state.note(|| format!("T{} committed at LSN {} and ended at LSN {}", txn, commit_lsn, end_lsn));

    state.force(end_lsn);
    state.transactions.remove(txn);
}

fn checkpoint(state: &mut State) {
    let dirty = state.dirty_pages.len();
    let active = state.transactions.len();
    let lsn = state.log.append(LogEntry::Checkpoint {
        dirty_pages: state.dirty_pages.clone(),
        transactions: state.transactions.clone(),
    });
    state.note(|| {
        format!(
            "checkpoint at LSN {} saved {} dirty pages and {} transactions",
            lsn, dirty, active
        )
    });
}

fn flush(state: &mut State, page: &str) -> Result<()> {
    let page_lsn = match state.pages.buffered(page).map(|buffered| buffered.page_lsn) {
        Some(page_lsn) => page_lsn,
        None => {
            if !state.pages.is_provisioned(page) {
                return Err(state.fail(Violation::UnprovisionedPage(page.to_string())));
            }
            if state.dirty_pages.contains(page) {
                return Err(state.fail(Violation::DirtyPageNotResident(page.to_string())));
            }
            log::trace!("flush of {} skipped: not in the buffer pool", page);
            state.note(|| format!("{} is not in the buffer pool, nothing to flush", page));
            return Ok(());
        }
    };

    // Write-ahead rule: the log reaches the page's last update first
    if let Some(lsn) = page_lsn {
        state.force(lsn);
    }
    state
        .pages
        .flush_to_disk(page)
        .map_err(|violation| state.fail(violation))?;
    state.dirty_pages.remove(page);
    state.note(|| format!("{} flushed to disk and evicted", page));
    Ok(())
}
