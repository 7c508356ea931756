use super::*;
use crate::parser::Parser;
use crate::recovery::log::LogEntry;
use crate::recovery::{analysis, crash, forward, redo, undo};
use crate::types::{Cursor, Page, Phase, TxnStatus};

fn ops(input: &str) -> Vec<Operation> {
    Parser::parse(input).unwrap()
}

fn run_quiet(input: &str) -> History {
    Simulator::new(SimulationConfig::quiet())
        .run(&ops(input))
        .unwrap()
}

fn cursors(history: &History, phase: Phase) -> Vec<Option<Cursor>> {
    history
        .phase_range(phase)
        .map(|i| history.get(i).unwrap().cursor())
        .collect()
}

#[test]
fn test_scenario_one_loser() {
    let history = run_quiet("W_1(A,a), W_2(B,b), Commit_1()");

    // 3 forward, 1 crash, 6 analysis, 5 redo, 2 undo
    assert_eq!(history.len(), 17);
    assert_eq!(history.phase_range(Phase::Normal), 0..3);
    assert_eq!(history.phase_range(Phase::Crashed), 3..4);
    assert_eq!(history.phase_range(Phase::Analysis), 4..10);
    assert_eq!(history.phase_range(Phase::Redo), 10..15);
    assert_eq!(history.phase_range(Phase::Undo), 15..17);

    let analyzed = history.get(9).unwrap();
    assert_eq!(analyzed.dirty_pages().rec_lsn("A"), Some(0));
    assert_eq!(analyzed.dirty_pages().rec_lsn("B"), Some(1));
    assert_eq!(analyzed.dirty_pages().len(), 2);
    let loser = analyzed.transactions().get("2").unwrap();
    assert_eq!(loser.status, TxnStatus::Aborted);
    assert_eq!(loser.last_lsn, 1);
    assert!(!analyzed.transactions().contains("1"));

    let redone = history.get(14).unwrap();
    assert_eq!(
        redone.buffer_pool().get("A"),
        Some(&Page::new(0, Some("a".into())))
    );

    let last = history.last().unwrap();
    assert_eq!(last.phase(), Phase::Undo);
    assert_eq!(last.log().len(), 6);
    assert_eq!(
        last.log()[4],
        LogEntry::Compensation {
            txn: "2".into(),
            page: "B".into(),
            after: None,
            undo_next_lsn: None,
            prev_lsn: Some(1),
        }
    );
    assert_eq!(
        last.log()[5],
        LogEntry::End {
            txn: "2".into(),
            prev_lsn: Some(4),
        }
    );
    assert_eq!(last.buffer_pool().get("B"), Some(&Page::new(4, None)));
    assert_eq!(
        last.buffer_pool().get("A"),
        Some(&Page::new(0, Some("a".into())))
    );
    assert!(last.transactions().is_empty());
    // Recovery never flushes or forces
    assert_eq!(last.disk().get("A"), Some(&Page::sentinel()));
    assert_eq!(last.durable(), 4);
}

#[test]
fn test_committed_transaction_round_trip() {
    let history = run_quiet("W_1(A,x), Commit_1()");

    let analysis = history.phase_range(Phase::Analysis);
    assert_eq!(history.get(analysis.start).unwrap().cursor(), Some(Cursor::Entry(0)));
    let analyzed = history.get(analysis.end - 1).unwrap();
    assert!(analyzed.transactions().is_empty());
    assert_eq!(analyzed.dirty_pages().rec_lsn("A"), Some(0));

    // A was never flushed, so redo has to bring it back
    let redone = history.get(history.phase_range(Phase::Redo).end - 1).unwrap();
    assert_eq!(
        redone.buffer_pool().get("A"),
        Some(&Page::new(0, Some("x".into())))
    );

    let undo = history.phase_range(Phase::Undo);
    assert_eq!(undo.len(), 1);
    assert_eq!(history.get(undo.start).unwrap().cursor(), None);
    assert_eq!(history.last().unwrap().log().len(), 3);
}

#[test]
fn test_losers_undone_in_reverse_log_order() {
    let history = run_quiet(
        "W_1(A,v0), W_2(B,v1), W_1(A,v2), W_2(B,v3), W_1(C,v4), \
         W_1(A,v5), W_2(C,v6), W_2(B,v7), W_2(A,v8), Flush(A)",
    );

    let crashed = history.get(history.phase_range(Phase::Crashed).start).unwrap();
    assert_eq!(crashed.durable(), 9);
    assert_eq!(crashed.log().len(), 9);

    let analysis = history.phase_range(Phase::Analysis);
    let analyzed = history.get(analysis.end - 1).unwrap();
    assert_eq!(analyzed.transactions().last_lsn("1"), Some(5));
    assert_eq!(analyzed.transactions().last_lsn("2"), Some(8));

    // Every logged update belongs to a loser, so undo visits them all
    let undone: Vec<Option<Cursor>> = cursors(&history, Phase::Undo);
    assert_eq!(
        undone,
        [8, 8, 7, 6, 5, 4, 3, 2, 1, 0]
            .iter()
            .map(|&lsn| Some(Cursor::Entry(lsn)))
            .collect::<Vec<_>>()
    );

    let last = history.last().unwrap();
    assert_eq!(
        last.log()[9],
        LogEntry::Compensation {
            txn: "2".into(),
            page: "A".into(),
            after: Some("v5".into()),
            undo_next_lsn: Some(7),
            prev_lsn: Some(8),
        }
    );
    // T2 finishes first: CLRs at 9..=16, End T2 at 17, CLR for LSN 0, End T1
    assert_eq!(last.log().len(), 20);
    assert_eq!(last.log()[17].kind(), "end");
    assert_eq!(last.log()[17].txn().map(String::as_str), Some("2"));
    assert_eq!(last.log()[19].kind(), "end");
    assert_eq!(last.log()[19].txn().map(String::as_str), Some("1"));
    assert_eq!(last.buffer_pool().get("A"), Some(&Page::new(18, None)));
    assert!(last.transactions().is_empty());
}

#[test]
fn test_redo_skips_pages_already_on_disk() {
    let history = run_quiet("W_1(A,x), Flush(A), W_2(B,y), Commit_2()");

    let redo = history.phase_range(Phase::Redo);
    let first = history.get(redo.start).unwrap();
    assert_eq!(first.cursor(), Some(Cursor::Entry(0)));

    let redone = history.get(redo.end - 1).unwrap();
    // LSN 0 is on disk already, so A stays out of the buffer pool
    assert!(redone.buffer_pool().get("A").is_none());
    assert_eq!(
        redone.buffer_pool().get("B"),
        Some(&Page::new(1, Some("y".into())))
    );

    let last = history.last().unwrap();
    assert_eq!(last.buffer_pool().get("A"), Some(&Page::new(4, None)));
}

#[test]
fn test_crash_drops_unforced_tail() {
    let history = run_quiet("W_1(A,x), W_2(B,y), Commit_2(), W_1(A,z)");

    let before = history.get(3).unwrap();
    assert_eq!(before.log().len(), 5);
    assert_eq!(before.durable(), 4);

    let crashed = history.get(4).unwrap();
    assert_eq!(crashed.phase(), Phase::Crashed);
    assert_eq!(crashed.log().len(), 4);
    assert!(crashed.buffer_pool().is_empty());
    assert!(crashed.transactions().is_empty());
    assert!(crashed.dirty_pages().is_empty());

    // Recorded snapshots are never rewritten by later phases
    assert_eq!(history.get(3).unwrap().log().len(), 5);

    let last = history.last().unwrap();
    assert_eq!(last.buffer_pool().get("A"), Some(&Page::new(4, None)));
    assert_eq!(last.log().len(), 6);
}

#[test]
fn test_checkpoint_scenario() {
    let history = run_quiet("W_1(A,a), Checkpoint(), W_2(B,b), Commit_2()");

    let analysis = history.phase_range(Phase::Analysis);
    // Opening snapshot, LSNs 1 through 4, closing snapshot
    assert_eq!(analysis.len(), 6);
    assert_eq!(history.get(analysis.start).unwrap().cursor(), Some(Cursor::Entry(1)));

    let analyzed = history.get(analysis.end - 1).unwrap();
    assert_eq!(analyzed.dirty_pages().rec_lsn("A"), Some(0));
    assert_eq!(analyzed.dirty_pages().rec_lsn("B"), Some(2));
    assert_eq!(
        analyzed.transactions().get("1").map(|entry| entry.status),
        Some(TxnStatus::Aborted)
    );

    // Redo starts below the checkpoint, at the smallest recLSN
    let redo = history.phase_range(Phase::Redo);
    assert_eq!(redo.len(), 6);
    assert_eq!(history.get(redo.start).unwrap().cursor(), Some(Cursor::Entry(0)));

    let last = history.last().unwrap();
    assert_eq!(
        last.log()[5],
        LogEntry::Compensation {
            txn: "1".into(),
            page: "A".into(),
            after: None,
            undo_next_lsn: None,
            prev_lsn: Some(0),
        }
    );
    assert_eq!(last.buffer_pool().get("A"), Some(&Page::new(5, None)));
    assert_eq!(
        last.buffer_pool().get("B"),
        Some(&Page::new(2, Some("b".into())))
    );
}

#[test]
fn test_second_redo_pass_changes_nothing() {
    let operations = ops("W_1(A,a), W_2(B,b), Flush(B), W_1(B,c), Commit_2(), W_3(A,d)");
    let mut history = History::new();
    let state = State::for_operations(&operations, false);
    let state = forward::run(state, &operations, &mut history).unwrap();
    let state = crash::run(state, &mut history);
    let state = analysis::run(state, &mut history).unwrap();
    let once = redo::run(state, &mut history).unwrap();
    let twice = redo::run(once.clone(), &mut history).unwrap();

    assert_eq!(once.log, twice.log);
    assert_eq!(once.pages, twice.pages);
    assert_eq!(once.transactions, twice.transactions);
    assert_eq!(once.dirty_pages, twice.dirty_pages);

    let done = undo::run(twice, &mut history).unwrap();
    assert!(done.transactions.is_empty());
}

#[test]
fn test_forward_only_stops_before_crash() {
    let operations = ops("W_1(A,a), W_2(B,b), Commit_1()");
    let history = Simulator::new(SimulationConfig::forward_only())
        .run(&operations)
        .unwrap();

    assert_eq!(history.len(), operations.len());
    assert!(history.iter().all(|snapshot| snapshot.phase() == Phase::Normal));
    assert!(history.phase_range(Phase::Crashed).is_empty());
    assert_eq!(
        cursors(&history, Phase::Normal),
        vec![
            Some(Cursor::Operation(0)),
            Some(Cursor::Operation(1)),
            Some(Cursor::Operation(2)),
        ]
    );
}

#[test]
fn test_narration() {
    let operations = ops("W_1(A,a), Commit_1()");

    let quiet = Simulator::new(SimulationConfig::quiet()).run(&operations).unwrap();
    assert!(quiet.iter().all(|snapshot| snapshot.notes().is_empty()));

    let narrated = simulate(&operations).unwrap();
    assert_eq!(narrated.len(), quiet.len());
    let first = narrated.get(0).unwrap();
    assert!(first.notes()[0].contains("T1 wrote A"));
    assert!(narrated.iter().all(|snapshot| !snapshot.notes().is_empty()));
}

#[test]
fn test_phases_are_contiguous() {
    let history = run_quiet("W_1(A,a), Checkpoint(), W_2(B,b), Flush(A), Commit_2()");
    let mut end = 0;
    for phase in [
        Phase::Normal,
        Phase::Crashed,
        Phase::Analysis,
        Phase::Redo,
        Phase::Undo,
    ] {
        let range = history.phase_range(phase);
        assert_eq!(range.start, end);
        assert!(!range.is_empty(), "no snapshots for {}", phase);
        end = range.end;
    }
    assert_eq!(end, history.len());
}

#[test]
fn test_force_at_commit_and_write_ahead() {
    let history = run_quiet("W_1(A,x), W_1(B,y), Flush(B), W_2(A,z), Commit_2()");

    // Flush(B) forces through B's pageLSN (1)
    let flushed = history.get(2).unwrap();
    assert_eq!(flushed.durable(), 2);
    assert_eq!(flushed.disk().get("B"), Some(&Page::new(1, Some("y".into()))));
    assert!(!flushed.dirty_pages().contains("B"));

    // Commit_2 forces through its End record at LSN 4
    let committed = history.get(4).unwrap();
    assert_eq!(committed.log().len(), 5);
    assert_eq!(committed.durable(), 5);
}

#[test]
fn test_empty_schedule() {
    let history = run_quiet("");
    // crash, analysis open and close, redo, undo
    assert_eq!(history.len(), 5);
    assert!(history.phase_range(Phase::Normal).is_empty());
    assert!(history.last().unwrap().log().is_empty());
}
