//! ARIES recovery engine
//!
//! Named after the recovery algorithm it walks through: Analysis, Redo and
//! Undo over a write-ahead log.
//!
//! The engine is a pipeline of phase functions over an owned [`State`]:
//! `forward` produces the log from an operation schedule, `crash` drops the
//! volatile state, and `analysis`, `redo` and `undo` rebuild a consistent
//! state. Each step is recorded in a [`History`].

pub mod analysis;
pub mod crash;
pub mod forward;
pub mod history;
pub mod log;
pub mod pages;
pub mod redo;
pub mod simulator;
pub mod state;
pub mod tables;
pub mod undo;

// Public API
pub use history::{History, Snapshot, SnapshotView, TraceFormat};
pub use self::log::{Log, LogEntry};
pub use pages::PageStore;
pub use redo::RedoDecision;
pub use simulator::{simulate, SimulationConfig, Simulator};
pub use state::State;
pub use tables::{DirtyPageEntry, DirtyPageTable, TransactionTable, TxnEntry};
