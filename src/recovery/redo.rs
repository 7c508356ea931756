//! Redo phase
//!
//! Repeats history from the oldest recLSN in the dirty page table, reapplying
//! every update that is not provably on disk already. Reapplying an update
//! overwrites the buffered page with the logged after-image, so the pass is
//! idempotent.

use super::history::History;
use super::log::LogEntry;
use super::state::State;
use crate::error::{Result, Violation};
use crate::types::{Cursor, DisplayLsn, Lsn, Page, PageId, Phase};

/// Outcome of examining one update during redo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedoDecision {
    /// Reapply the update
    Apply,
    /// The page is not in the dirty page table
    NotDirty,
    /// The page was dirtied again only after this update
    RecLsnAfter(Lsn),
    /// The disk copy already reflects this update
    OnDisk(Option<Lsn>),
}

/// Run redo over the post-analysis state
pub fn run(mut state: State, history: &mut History) -> Result<State> {
    state.phase = Phase::Redo;
    let start = state.dirty_pages.min_rec_lsn();
    state.begin_step(start.map(Cursor::Entry));

    let Some(start) = start else {
        log::info!("Redo: dirty page table is empty, nothing to redo");
        state.note(|| "dirty page table is empty, nothing to redo".to_string());
        history.record(&state);
        return Ok(state);
    };

    log::info!("Redo starting at LSN {}", start);
    state.note(|| format!("redo starts at the smallest recLSN, {}", start));
    history.record(&state);

    let mut applied = 0;
    for lsn in start..state.log.next_lsn() {
        state.begin_step(Some(Cursor::Entry(lsn)));
        let entry = match state.log.get(lsn) {
            Some(entry) => entry.clone(),
            None => return Err(state.fail(Violation::MissingEntry(lsn))),
        };

        match entry {
            LogEntry::Update { page, after, .. } => {
                if redo_update(&mut state, lsn, &page, after)? {
                    applied += 1;
                }
            }
            LogEntry::Commit { .. } | LogEntry::End { .. } | LogEntry::Checkpoint { .. } => {
                log::trace!("redo LSN {}: {} record carries no page change", lsn, entry.kind());
                state.note(|| format!("{} record at LSN {} is not redone", entry.kind(), lsn));
            }
            LogEntry::Compensation { .. } => {
                return Err(state.fail(Violation::UnexpectedRecord("compensation")));
            }
        }
        history.record(&state);
    }

    log::info!("Redo complete. {} updates reapplied", applied);
    Ok(state)
}

/// Decide whether the update at `lsn` on `page` has to be reapplied
pub fn decide(state: &State, lsn: Lsn, page: &str) -> Result<RedoDecision> {
    let Some(rec_lsn) = state.dirty_pages.rec_lsn(page) else {
        return Ok(RedoDecision::NotDirty);
    };
    if rec_lsn > lsn {
        return Ok(RedoDecision::RecLsnAfter(rec_lsn));
    }
    let on_disk = state
        .pages
        .on_disk(page)
        .ok_or_else(|| state.fail(Violation::UnprovisionedPage(page.to_string())))?;
    if on_disk.page_lsn >= Some(lsn) {
        return Ok(RedoDecision::OnDisk(on_disk.page_lsn));
    }
    Ok(RedoDecision::Apply)
}

fn redo_update(state: &mut State, lsn: Lsn, page: &PageId, after: String) -> Result<bool> {
    match decide(state, lsn, page)? {
        RedoDecision::Apply => {
            state.note(|| format!("redo LSN {}: {} set to {}", lsn, page, after));
            *state.pin(page)? = Page::new(lsn, Some(after));
            log::debug!("redo LSN {}: reapplied to {}", lsn, page);
            Ok(true)
        }
        RedoDecision::NotDirty => {
            log::trace!("redo LSN {} skipped: {} not dirty", lsn, page);
            state.note(|| format!("redo skipped LSN {}: {} is not in the dirty page table", lsn, page));
            Ok(false)
        }
        RedoDecision::RecLsnAfter(rec_lsn) => {
            log::trace!("redo LSN {} skipped: recLSN {} is later", lsn, rec_lsn);
            state.note(|| {
                format!(
                    "redo skipped LSN {}: {} has recLSN {} > {}",
                    lsn, page, rec_lsn, lsn
                )
            });
            Ok(false)
        }
        RedoDecision::OnDisk(page_lsn) => {
            log::trace!("redo LSN {} skipped: already on disk", lsn);
            state.note(|| {
                format!(
                    "redo skipped LSN {}: disk pageLSN {} >= {}",
                    lsn,
                    DisplayLsn(page_lsn),
                    lsn
                )
            });
            Ok(false)
        }
    }
}
