//! Integration tests for the sync ledger

mod common;

use common::{clock, create_test_ledger, ledger_path, reopen};
use offsite_core::Error;
use offsite_sync::{SyncLedger, SyncRegistrar, SyncState};
use std::fs;
use tempfile::TempDir;

fn state(push: &[&str], sync: &[&str]) -> SyncState {
    SyncState {
        push: push.iter().map(|s| s.to_string()).collect(),
        sync: sync.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn test_new_ledger_is_empty() {
    let (mut ledger, temp) = create_test_ledger();
    assert!(ledger.current_state().unwrap().is_empty());
    assert!(ledger_path(&temp).exists());
}

#[test]
fn test_completion_markers_reconcile() {
    let (mut ledger, _temp) = create_test_ledger();
    ledger.push_path("a").unwrap();
    ledger.push_path("b").unwrap();
    ledger.sync_path("c").unwrap();
    ledger.sync_path("d").unwrap();
    ledger.push_done("a").unwrap();
    ledger.sync_done("d").unwrap();

    assert_eq!(ledger.current_state().unwrap(), state(&["b"], &["c"]));

    let mut ledger = reopen(ledger);
    assert_eq!(ledger.current_state().unwrap(), state(&["b"], &["c"]));
}

#[test]
fn test_replay_matches_in_memory_state() {
    let (mut ledger, _temp) = create_test_ledger();
    let ops: &[(&str, &str)] = &[
        ("+push", "x/1/"),
        ("+sync", "x"),
        ("+push", "y.tgz"),
        ("-push", "x/1/"),
        ("+push", "x/1/"),
        ("+sync", ""),
        ("-sync", "x"),
        ("+push", "z"),
        ("-push", "y.tgz"),
    ];

    for (op, path) in ops {
        match *op {
            "+push" => ledger.push_path(path).unwrap(),
            "+sync" => ledger.sync_path(path).unwrap(),
            "-push" => ledger.push_done(path).unwrap(),
            "-sync" => ledger.sync_done(path).unwrap(),
            _ => unreachable!(),
        }
    }

    let in_memory = ledger.current_state().unwrap();
    let mut ledger = reopen(ledger);
    assert_eq!(ledger.current_state().unwrap(), in_memory);
    assert_eq!(in_memory, state(&["x/1/", "z"], &[""]));
}

#[test]
fn test_done_for_absent_path_leaves_file_unchanged() {
    let (mut ledger, temp) = create_test_ledger();
    ledger.push_path("a").unwrap();
    let before = fs::read(ledger_path(&temp)).unwrap();

    let err = ledger.push_done("b").unwrap_err();
    assert!(matches!(err, Error::NotPending { .. }));
    let err = ledger.sync_done("a").unwrap_err();
    assert!(matches!(err, Error::NotPending { .. }));

    assert_eq!(fs::read(ledger_path(&temp)).unwrap(), before);
}

#[test]
fn test_absolute_paths_rejected() {
    let (mut ledger, temp) = create_test_ledger();
    assert!(matches!(
        ledger.push_path("/etc/passwd"),
        Err(Error::InvalidPath { .. })
    ));
    assert!(matches!(
        ledger.sync_path("/srv"),
        Err(Error::InvalidPath { .. })
    ));
    assert_eq!(fs::read(ledger_path(&temp)).unwrap().len(), 0);
}

#[test]
fn test_reset_refused_with_pending_work() {
    let (mut ledger, _temp) = create_test_ledger();
    ledger.sync_path("").unwrap();

    let err = ledger.reset().unwrap_err();
    assert!(matches!(err, Error::PendingWork));
    assert_eq!(
        err.to_string(),
        "cannot reset: some files must be synced or pushed"
    );
}

#[test]
fn test_reset_truncates() {
    let (mut ledger, temp) = create_test_ledger();
    ledger.push_path("a").unwrap();
    ledger.push_done("a").unwrap();
    ledger.reset().unwrap();

    assert_eq!(fs::read(ledger_path(&temp)).unwrap().len(), 0);
    let mut ledger = reopen(ledger);
    assert!(ledger.current_state().unwrap().is_empty());

    // Still appendable after truncation
    ledger.push_path("b").unwrap();
    let mut ledger = reopen(ledger);
    assert_eq!(ledger.current_state().unwrap(), state(&["b"], &[]));
}

#[test]
fn test_second_open_fails_with_lock_held() {
    let (_ledger, temp) = create_test_ledger();
    let err = SyncLedger::open(ledger_path(&temp), clock()).unwrap_err();
    assert!(err.is_lock_held());
}

#[test]
fn test_lock_released_on_drop() {
    let (ledger, temp) = create_test_ledger();
    drop(ledger);
    assert!(SyncLedger::open(ledger_path(&temp), clock()).is_ok());
}

#[test]
fn test_corrupt_sign_detected_on_first_read() {
    let temp = TempDir::new().unwrap();
    fs::write(
        ledger_path(&temp),
        "2016-01-01T12:00:00 +push a\n2016-01-01T12:00:00 ~push a\n",
    )
    .unwrap();

    let mut ledger = SyncLedger::open(ledger_path(&temp), clock()).unwrap();
    let err = ledger.current_state().unwrap_err();
    assert!(matches!(err, Error::CorruptLedger { line: 2, .. }));
}

#[test]
fn test_invalid_utf8_line_is_corrupt() {
    let temp = TempDir::new().unwrap();
    let mut content = b"2016-01-01T12:00:00 +push a\n2016-01-01T12:00:00 +push ".to_vec();
    content.extend_from_slice(&[0xff, 0xfe, b'\n']);
    fs::write(ledger_path(&temp), content).unwrap();

    let mut ledger = SyncLedger::open(ledger_path(&temp), clock()).unwrap();
    assert!(matches!(
        ledger.current_state(),
        Err(Error::CorruptLedger { line: 2, .. })
    ));
}

#[test]
fn test_replayed_removal_of_absent_path_is_corrupt() {
    let temp = TempDir::new().unwrap();
    fs::write(ledger_path(&temp), "2016-01-01T12:00:00 -sync a\n").unwrap();

    let mut ledger = SyncLedger::open(ledger_path(&temp), clock()).unwrap();
    assert!(matches!(
        ledger.current_state(),
        Err(Error::CorruptLedger { line: 1, .. })
    ));
}

#[test]
fn test_existing_file_is_appended_to() {
    let temp = TempDir::new().unwrap();
    fs::write(ledger_path(&temp), "2015-12-31T00:00:00 +push old\n").unwrap();

    let mut ledger = SyncLedger::open(ledger_path(&temp), clock()).unwrap();
    ledger.push_path("new").unwrap();
    assert_eq!(ledger.current_state().unwrap(), state(&["old", "new"], &[]));

    let content = fs::read_to_string(ledger_path(&temp)).unwrap();
    assert_eq!(
        content,
        "2015-12-31T00:00:00 +push old\n2016-01-01T12:00:00 +push new\n"
    );
}
