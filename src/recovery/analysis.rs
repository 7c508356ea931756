//! Analysis phase
//!
//! Rebuilds the transaction table and dirty page table as they stood at crash
//! time by scanning forward from the most recent checkpoint (or the start of
//! the log), then marks every transaction still in progress as a loser.

use super::history::History;
use super::log::LogEntry;
use super::state::State;
use crate::error::{Result, Violation};
use crate::types::{Cursor, Lsn, Phase, TxnStatus};

/// Run analysis over the crashed state
pub fn run(mut state: State, history: &mut History) -> Result<State> {
    let checkpoint = state.log.last_checkpoint();
    let start = checkpoint.unwrap_or(0);
    state.phase = Phase::Analysis;
    state.begin_step(Some(Cursor::Entry(start)));
    log::info!("Analysis starting at LSN {} over {} log entries", start, state.log.len());
    match checkpoint {
        Some(lsn) => state.note(|| format!("analysis starts at the checkpoint at LSN {}", lsn)),
        None => state.note(|| "no checkpoint in the log, analysis starts at LSN 0".to_string()),
    }
    history.record(&state);

    for lsn in start..state.log.next_lsn() {
        state.begin_step(Some(Cursor::Entry(lsn)));
        let entry = match state.log.get(lsn) {
            Some(entry) => entry.clone(),
            None => return Err(state.fail(Violation::MissingEntry(lsn))),
        };
        analyze(&mut state, lsn, start, entry)?;
        history.record(&state);
    }

    state.begin_step(None);
    let losers = state.transactions.abort_in_progress();
    log::info!(
        "Analysis complete. {} dirty pages, {} loser transactions",
        state.dirty_pages.len(),
        losers.len()
    );
    if losers.is_empty() {
        state.note(|| "no loser transactions".to_string());
    } else {
        state.note(|| format!("losers marked aborted: T{}", losers.join(", T")));
    }
    history.record(&state);

    Ok(state)
}

fn analyze(state: &mut State, lsn: Lsn, start: Lsn, entry: LogEntry) -> Result<()> {
    match entry {
        LogEntry::Update { txn, page, .. } => {
            if state.dirty_pages.mark_dirty(&page, lsn) {
                state.note(|| format!("{} added to the dirty page table with recLSN {}", page, lsn));
            }
            if state.transactions.touch(&txn, lsn) {
                state.note(|| format!("T{} added to the transaction table", txn));
            }
            state.note(|| format!("T{} lastLSN = {}", txn, lsn));
        }
        LogEntry::Commit { txn, .. } => {
            state.transactions.touch(&txn, lsn);
            state.transactions.set_status(&txn, TxnStatus::Committed);
            state.note(|| format!("T{} committed, lastLSN = {}", txn, lsn));
        }
        LogEntry::End { txn, .. } => {
            state.transactions.remove(&txn);
            state.note(|| format!("T{} ended and left the transaction table", txn));
        }
        LogEntry::Compensation { .. } => {
            return Err(state.fail(Violation::UnexpectedRecord("compensation")));
        }
        LogEntry::Checkpoint {
            dirty_pages,
            transactions,
        } => {
            if lsn != start || !state.volatile_is_empty() {
                return Err(state.fail(Violation::MisplacedCheckpoint));
            }
            state.note(|| {
                format!(
                    "loaded {} dirty pages and {} transactions from the checkpoint",
                    dirty_pages.len(),
                    transactions.len()
                )
            });
            state.dirty_pages = dirty_pages;
            state.transactions = transactions;
        }
    }
    log::debug!(
        "analysis LSN {}: {} transactions, {} dirty pages",
        lsn,
        state.transactions.len(),
        state.dirty_pages.len()
    );
    Ok(())
}
