//! Append-only snapshot history
//!
//! Every step of a simulation is recorded as a frame. Frames do not copy the
//! log: the log only grows, except once when a crash drops its non-durable
//! suffix, so the history keeps one log per epoch (before and after the
//! crash) and each frame remembers how long its prefix was. Recording a step
//! costs a copy of the tables and pages, never of the log.
//!
//! ## Trace files
//! A history can be saved as JSON (for inspection) or bincode (compact).
//! Files are written to a temporary file in the target directory and renamed
//! into place, so a partially written trace is never observed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use super::log::LogEntry;
use super::pages::PageStore;
use super::state::State;
use super::tables::{DirtyPageTable, TransactionTable};
use crate::error::{AriesError, Result};
use crate::types::{Cursor, Page, PageId, Phase};

/// On-disk trace encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    Json,
    Bincode,
}

impl TraceFormat {
    /// Parse format from string name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(TraceFormat::Json),
            "bincode" | "bin" => Some(TraceFormat::Bincode),
            _ => None,
        }
    }
}

/// One recorded step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Frame {
    phase: Phase,
    epoch: usize,
    log_len: usize,
    transactions: TransactionTable,
    dirty_pages: DirtyPageTable,
    pages: PageStore,
    durable: usize,
    cursor: Option<Cursor>,
    notes: Vec<String>,
}

/// Ordered, append-only sequence of snapshots produced by a simulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    epochs: Vec<Vec<LogEntry>>,
    frames: Vec<Frame>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot of `state`
    pub(crate) fn record(&mut self, state: &State) {
        let entries = state.log.entries();
        let current = self.epochs.last().map(Vec::len);
        match current {
            Some(len) if entries.len() >= len => {
                if let Some(epoch) = self.epochs.last_mut() {
                    debug_assert_eq!(&epoch[..], &entries[..len], "log rewrote a recorded prefix");
                    epoch.extend_from_slice(&entries[len..]);
                }
            }
            _ => {
                // First frame, or the log lost its tail
                self.epochs.push(entries.to_vec());
            }
        }

        self.frames.push(Frame {
            phase: state.phase,
            epoch: self.epochs.len() - 1,
            log_len: entries.len(),
            transactions: state.transactions.clone(),
            dirty_pages: state.dirty_pages.clone(),
            pages: state.pages.clone(),
            durable: state.durable,
            cursor: state.cursor,
            notes: state.notes.clone(),
        });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SnapshotView<'_>> {
        self.frames.get(index).map(|frame| SnapshotView {
            history: self,
            frame,
        })
    }

    pub fn last(&self) -> Option<SnapshotView<'_>> {
        self.frames.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = SnapshotView<'_>> {
        self.frames.iter().map(move |frame| SnapshotView {
            history: self,
            frame,
        })
    }

    /// Indices of the snapshots recorded during `phase`
    pub fn phase_range(&self, phase: Phase) -> Range<usize> {
        let start = self.frames.partition_point(|frame| frame.phase < phase);
        let end = self.frames.partition_point(|frame| frame.phase <= phase);
        start..end
    }

    /// Fully materialized copies of every snapshot
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.iter().map(|view| view.materialize()).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let history: Self = serde_json::from_str(json)?;
        history.validate()?;
        Ok(history)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let history: Self = bincode::deserialize(bytes)?;
        history.validate()?;
        Ok(history)
    }

    /// Check that every frame points inside its epoch and phases never go
    /// backwards
    fn validate(&self) -> Result<()> {
        let mut previous = None;
        for (index, frame) in self.frames.iter().enumerate() {
            let epoch = self.epochs.get(frame.epoch).ok_or_else(|| {
                AriesError::Encoding(format!(
                    "snapshot {} refers to missing log epoch {}",
                    index, frame.epoch
                ))
            })?;
            if frame.log_len > epoch.len() {
                return Err(AriesError::Encoding(format!(
                    "snapshot {} has log length {} but its epoch holds {} entries",
                    index,
                    frame.log_len,
                    epoch.len()
                )));
            }
            if previous.map_or(false, |phase| frame.phase < phase) {
                return Err(AriesError::Encoding(format!(
                    "snapshot {} goes back to phase {}",
                    index, frame.phase
                )));
            }
            previous = Some(frame.phase);
        }
        Ok(())
    }

    /// Atomically write the trace to `path`
    pub fn save(&self, path: &Path, format: TraceFormat) -> Result<()> {
        let bytes = match format {
            TraceFormat::Json => self.to_json()?.into_bytes(),
            TraceFormat::Bincode => self.to_bytes()?,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        log::info!("Saved {} snapshots to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path, format: TraceFormat) -> Result<Self> {
        let bytes = fs::read(path)?;
        match format {
            TraceFormat::Json => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| AriesError::Encoding(e.to_string()))?;
                Self::from_json(&text)
            }
            TraceFormat::Bincode => Self::from_bytes(&bytes),
        }
    }
}

/// Borrowed view of one recorded snapshot
#[derive(Debug, Clone, Copy)]
pub struct SnapshotView<'a> {
    history: &'a History,
    frame: &'a Frame,
}

impl<'a> SnapshotView<'a> {
    pub fn phase(&self) -> Phase {
        self.frame.phase
    }

    pub fn log(&self) -> &'a [LogEntry] {
        &self.history.epochs[self.frame.epoch][..self.frame.log_len]
    }

    pub fn transactions(&self) -> &'a TransactionTable {
        &self.frame.transactions
    }

    pub fn dirty_pages(&self) -> &'a DirtyPageTable {
        &self.frame.dirty_pages
    }

    pub fn buffer_pool(&self) -> &'a BTreeMap<PageId, Page> {
        self.frame.pages.buffer_pool()
    }

    pub fn disk(&self) -> &'a BTreeMap<PageId, Page> {
        self.frame.pages.disk()
    }

    /// Number of log entries durable at this point
    pub fn durable(&self) -> usize {
        self.frame.durable
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.frame.cursor
    }

    pub fn notes(&self) -> &'a [String] {
        &self.frame.notes
    }

    /// Independent copy of this snapshot
    pub fn materialize(&self) -> Snapshot {
        Snapshot {
            phase: self.phase(),
            log: self.log().to_vec(),
            transactions: self.transactions().clone(),
            dirty_pages: self.dirty_pages().clone(),
            buffer_pool: self.buffer_pool().clone(),
            disk: self.disk().clone(),
            durable: self.durable(),
            cursor: self.cursor(),
            notes: self.notes().to_vec(),
        }
    }
}

/// Owned point-in-time copy of the whole simulator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub log: Vec<LogEntry>,
    pub transactions: TransactionTable,
    pub dirty_pages: DirtyPageTable,
    pub buffer_pool: BTreeMap<PageId, Page>,
    pub disk: BTreeMap<PageId, Page>,
    pub durable: usize,
    pub cursor: Option<Cursor>,
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::log::LogEntry;
    use tempfile::tempdir;

    fn commit(txn: &str) -> LogEntry {
        LogEntry::Commit {
            txn: txn.into(),
            prev_lsn: None,
        }
    }

    fn state_with_log(phase: Phase, entries: Vec<LogEntry>) -> State {
        let mut state = State::new(PageStore::provisioned(["A"]), false);
        state.phase = phase;
        for entry in entries {
            state.log.append(entry);
        }
        state
    }

    #[test]
    fn test_frames_share_one_log_per_epoch() {
        let mut history = History::new();
        history.record(&state_with_log(Phase::Normal, vec![commit("1")]));
        history.record(&state_with_log(Phase::Normal, vec![commit("1"), commit("2")]));

        assert_eq!(history.epochs.len(), 1);
        assert_eq!(history.get(0).unwrap().log().len(), 1);
        assert_eq!(history.get(1).unwrap().log().len(), 2);
    }

    #[test]
    fn test_truncated_log_starts_new_epoch() {
        let mut history = History::new();
        history.record(&state_with_log(Phase::Normal, vec![commit("1"), commit("2")]));
        history.record(&state_with_log(Phase::Crashed, vec![commit("1")]));
        history.record(&state_with_log(Phase::Undo, vec![commit("1"), commit("3")]));

        assert_eq!(history.epochs.len(), 2);
        // The pre-crash snapshot still sees the lost entry
        assert_eq!(history.get(0).unwrap().log()[1], commit("2"));
        assert_eq!(history.get(2).unwrap().log()[1], commit("3"));
    }

    #[test]
    fn test_phase_range() {
        let mut history = History::new();
        history.record(&state_with_log(Phase::Normal, vec![]));
        history.record(&state_with_log(Phase::Normal, vec![]));
        history.record(&state_with_log(Phase::Crashed, vec![]));
        history.record(&state_with_log(Phase::Redo, vec![]));

        assert_eq!(history.phase_range(Phase::Normal), 0..2);
        assert_eq!(history.phase_range(Phase::Crashed), 2..3);
        assert_eq!(history.phase_range(Phase::Analysis), 3..3);
        assert_eq!(history.phase_range(Phase::Undo), 4..4);
    }

    #[test]
    fn test_save_and_load_trace() {
        let dir = tempdir().unwrap();
        let mut history = History::new();
        history.record(&state_with_log(Phase::Normal, vec![commit("1")]));

        for format in [TraceFormat::Json, TraceFormat::Bincode] {
            let path = dir.path().join("trace.out");
            history.save(&path, format).unwrap();
            let loaded = History::load(&path, format).unwrap();
            assert_eq!(loaded, history);
        }
    }

    #[test]
    fn test_from_json_rejects_inconsistent_frames() {
        let mut history = History::new();
        history.record(&state_with_log(Phase::Normal, vec![commit("1")]));
        history.record(&state_with_log(Phase::Crashed, vec![commit("1")]));
        let json = history.to_json().unwrap();
        assert_eq!(History::from_json(&json).unwrap(), history);

        let too_long = json.replacen("\"log_len\": 1", "\"log_len\": 99", 1);
        assert_ne!(too_long, json);
        assert!(matches!(
            History::from_json(&too_long),
            Err(AriesError::Encoding(_))
        ));

        let missing_epoch = json.replacen("\"epoch\": 0", "\"epoch\": 3", 1);
        assert!(matches!(
            History::from_json(&missing_epoch),
            Err(AriesError::Encoding(_))
        ));

        let mut backwards = history.clone();
        backwards.frames.swap(0, 1);
        let bytes = backwards.to_bytes().unwrap();
        assert!(matches!(
            History::from_bytes(&bytes),
            Err(AriesError::Encoding(_))
        ));
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(TraceFormat::from_name("JSON"), Some(TraceFormat::Json));
        assert_eq!(TraceFormat::from_name("bin"), Some(TraceFormat::Bincode));
        assert_eq!(TraceFormat::from_name("yaml"), None);
    }
}
