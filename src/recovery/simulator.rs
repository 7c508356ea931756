//! Simulation driver
//!
//! ## Phases
//! A run always walks the same pipeline, each stage appending to one shared
//! [`History`]:
//!
//! 1. Forward processing: one snapshot per operation
//! 2. Crash: one snapshot
//! 3. Analysis: opening snapshot, one per scanned entry, closing snapshot
//!    with the losers marked aborted
//! 4. Redo: opening snapshot, one per scanned entry
//! 5. Undo: opening snapshot, one per undone update
//!
//! The working [`State`] is moved from stage to stage; the history only ever
//! receives copies, so no recorded snapshot can change after it is appended.

use super::history::History;
use super::state::State;
use super::{analysis, crash, forward, redo, undo};
use crate::error::Result;
use crate::parser::Operation;

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Attach human-readable notes to every snapshot
    pub narrate: bool,
    /// Crash and recover after forward processing. When false the run stops
    /// after the last operation.
    pub crash: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            narrate: true,
            crash: true,
        }
    }
}

impl SimulationConfig {
    /// Create a config without narration
    pub fn quiet() -> Self {
        Self {
            narrate: false,
            ..Default::default()
        }
    }

    /// Create a config that only runs forward processing
    pub fn forward_only() -> Self {
        Self {
            crash: false,
            ..Default::default()
        }
    }
}

/// Runs operation schedules through forward processing, crash and recovery
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate `operations` and return the full snapshot history
    pub fn run(&self, operations: &[Operation]) -> Result<History> {
        let mut history = History::new();
        let state = State::for_operations(operations, self.config.narrate);

        let state = forward::run(state, operations, &mut history)?;
        if !self.config.crash {
            return Ok(history);
        }

        let state = crash::run(state, &mut history);
        let state = analysis::run(state, &mut history)?;
        let state = redo::run(state, &mut history)?;
        let state = undo::run(state, &mut history)?;

        log::info!(
            "Recovery complete. {} snapshots recorded, final log length {}",
            history.len(),
            state.log.len()
        );
        Ok(history)
    }
}

/// Simulate `operations` with the default configuration
pub fn simulate(operations: &[Operation]) -> Result<History> {
    Simulator::default().run(operations)
}

#[cfg(test)]
mod tests;
