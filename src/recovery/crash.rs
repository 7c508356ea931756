//! Crash model
//!
//! A crash loses everything volatile: the buffer pool, both tables and any log
//! entry that was never forced. Only the disk and the durable log prefix
//! survive.

use super::history::History;
use super::state::State;
use crate::types::Phase;

/// Crash `state`, recording the single crashed snapshot
pub fn run(mut state: State, history: &mut History) -> State {
    state.phase = Phase::Crashed;
    state.begin_step(None);

    let lost = state.log.len().saturating_sub(state.durable);
    let durable = state.durable.min(state.log.len());
    state.log.truncate(durable);
    state.durable = durable;

    let dropped_pages = state.pages.buffer_pool().len();
    state.transactions.clear();
    state.dirty_pages.clear();
    state.pages.clear_buffer_pool();

    log::info!(
        "Crash: {} durable log entries survive, {} lost, {} buffered pages dropped",
        durable,
        lost,
        dropped_pages
    );
    state.note(|| {
        format!(
            "crash: {} log entries were never forced and are lost; {} buffered pages dropped",
            lost, dropped_pages
        )
    });

    history.record(&state);
    state
}
