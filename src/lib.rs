//! ariesim - ARIES crash recovery simulator
//!
//! This is an educational implementation that walks a transaction schedule
//! through write-ahead logging, a crash and the three ARIES recovery phases,
//! recording every intermediate state:
//! - Operation language parsing
//! - Forward processing with force-at-commit and the WAL rule
//! - Analysis, Redo and Undo with compensation records
//! - Step-by-step snapshot history, saved as JSON or bincode traces
//!
//! Architecture Overview:
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Operation schedule                        │
//! │         W_1(A,x), Commit_1(), Flush(A), Checkpoint()        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Parser                                │
//! │           (Lexer → Parser → Vec<Operation>)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Simulator                              │
//! │   forward → crash → analysis → redo → undo over one State   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       History                               │
//! │      (append-only snapshots, JSON / bincode traces)         │
//! └─────────────────────────────────────────────────────────────┘

pub mod error;
pub mod lexer;
pub mod parser;
pub mod recovery;
pub mod types;

pub use error::{AriesError, Result, Violation};
pub use parser::{Operation, Parser};
pub use recovery::{simulate, History, SimulationConfig, Simulator, Snapshot, TraceFormat};
pub use types::{Cursor, Lsn, Page, PageId, PageValue, Phase, TxnId, TxnStatus};
