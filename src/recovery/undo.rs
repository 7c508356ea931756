//! Undo phase
//!
//! Rolls back every loser transaction. The pending set holds the next LSN to
//! undo for each loser; the largest LSN is always undone first, so each
//! transaction is rolled back most-recent-first and rollbacks of different
//! losers interleave in global reverse log order. Each undone update writes a
//! compensation record so the rollback itself is logged.

use std::collections::BTreeSet;

use super::history::History;
use super::log::LogEntry;
use super::state::State;
use crate::error::{Result, Violation};
use crate::types::{Cursor, DisplayValue, Lsn, Page, Phase};

/// Run undo over the post-redo state
pub fn run(mut state: State, history: &mut History) -> Result<State> {
    state.phase = Phase::Undo;
    let mut pending: BTreeSet<Lsn> = state
        .transactions
        .iter()
        .map(|(_, entry)| entry.last_lsn)
        .collect();

    state.begin_step(pending.last().copied().map(Cursor::Entry));
    log::info!("Undo starting with {} loser transactions", pending.len());
    if pending.is_empty() {
        state.note(|| "no loser transactions to undo".to_string());
    } else {
        let listed = pending
            .iter()
            .map(|lsn| lsn.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        state.note(|| format!("LSNs to undo: {}", listed));
    }
    history.record(&state);

    let mut compensations = 0;
    while let Some(lsn) = pending.pop_last() {
        state.begin_step(Some(Cursor::Entry(lsn)));
        if let Some(next) = undo_update(&mut state, lsn)? {
            pending.insert(next);
        }
        compensations += 1;
        history.record(&state);
    }

    log::info!("Undo complete. {} compensation records written", compensations);
    Ok(state)
}

/// Undo the update at `lsn`, returning the next LSN to undo for its
/// transaction
fn undo_update(state: &mut State, lsn: Lsn) -> Result<Option<Lsn>> {
    let (txn, page, before, prev_lsn) = match state.log.get(lsn) {
        Some(LogEntry::Update {
            txn,
            page,
            before,
            prev_lsn,
            ..
        }) => (txn.clone(), page.clone(), before.clone(), *prev_lsn),
        Some(other) => {
            let kind = other.kind();
            return Err(state.fail(Violation::NotAnUpdate(kind)));
        }
        None => return Err(state.fail(Violation::MissingEntry(lsn))),
    };

    let clr_lsn = state.log.next_lsn();
    *state.pin(&page)? = Page {
        page_lsn: Some(clr_lsn),
        value: before.clone(),
    };

    state.note(|| {
        format!(
            "undo LSN {}: {} restored to {}, CLR at LSN {}",
            lsn,
            page,
            DisplayValue(&before),
            clr_lsn
        )
    });
    state.log.append(LogEntry::Compensation {
        txn: txn.clone(),
        page,
        after: before,
        undo_next_lsn: prev_lsn,
        prev_lsn: state.transactions.last_lsn(&txn),
    });
    state.transactions.touch(&txn, clr_lsn);
    log::debug!("undo LSN {}: wrote CLR {} for T{}", lsn, clr_lsn, txn);

    if prev_lsn.is_none() {
        let end_lsn = state.log.append(LogEntry::End {
            txn: txn.clone(),
            prev_lsn: Some(clr_lsn),
        });
        state.transactions.remove(&txn);
        state.note(|| format!("T{} fully rolled back, END at LSN {}", txn, end_lsn));
    }
    Ok(prev_lsn)
}
