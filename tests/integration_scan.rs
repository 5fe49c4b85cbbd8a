//! Integration tests for ingesting replays discovered on disk.

mod common;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use common::ScriptedFactory;
use predicates::prelude::*;
use replay_enforcer::core::engine::OverallStatus;
use replay_enforcer::core::scanner::{collect_batch, ScanConfig};
use replay_enforcer::core::session::Session;
use std::path::PathBuf;

#[test]
fn directory_of_replays_is_ingested_in_path_order() {
    let temp = TempDir::new().unwrap();
    temp.child("b.slp").write_str("pass b").unwrap();
    temp.child("a.slp").write_str("pass a").unwrap();
    temp.child("nested/c.slp").write_str("flag c").unwrap();
    temp.child("nested/copy_of_a.slp").write_str("pass a").unwrap();
    temp.child("notes.txt").write_str("not a replay").unwrap();

    let scan = collect_batch(&[temp.path().to_path_buf()], &ScanConfig::default());
    assert!(scan.errors.is_empty());
    assert_eq!(scan.replays.len(), 4);

    let (factory, probe) = ScriptedFactory::healthy();
    let mut session = Session::builder()
        .engine(factory)
        .pool_size(1)
        .build()
        .unwrap();
    let summary = session.process_batch(scan.into_batch()).unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.analyzed, 3);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(probe.seen(), vec!["pass a", "pass b", "flag c"]);

    let names: Vec<_> = session
        .displayed()
        .iter()
        .map(|r| r.filename.clone())
        .collect();
    assert!(!names.contains(&"copy_of_a.slp".to_string()));
}

#[test]
fn missing_directory_is_reported_not_fatal() {
    let temp = TempDir::new().unwrap();
    temp.child("game.slp").write_str("pass").unwrap();

    let scan = collect_batch(
        &[
            temp.path().to_path_buf(),
            PathBuf::from("/nonexistent/slippi/folder"),
        ],
        &ScanConfig::default(),
    );

    assert_eq!(scan.replays.len(), 1);
    assert_eq!(scan.errors.len(), 1);
    let message = scan.errors[0].to_string();
    assert!(predicate::str::contains("/nonexistent/slippi/folder").eval(&message));
}

#[test]
fn file_deleted_after_scan_is_unreadable() {
    let temp = TempDir::new().unwrap();
    let kept = temp.child("kept.slp");
    kept.write_str("pass kept").unwrap();
    let gone = temp.child("gone.slp");
    gone.write_str("pass gone").unwrap();

    let scan = collect_batch(&[temp.path().to_path_buf()], &ScanConfig::default());
    std::fs::remove_file(gone.path()).unwrap();
    gone.assert(predicate::path::missing());

    let (factory, _) = ScriptedFactory::healthy();
    let mut session = Session::builder()
        .engine(factory)
        .pool_size(2)
        .build()
        .unwrap();
    let summary = session.process_batch(scan.into_batch()).unwrap();

    assert_eq!(summary.unreadable, 1);
    assert_eq!(summary.analyzed, 1);
    let statuses: Vec<_> = session.displayed().iter().map(|r| r.overall).collect();
    assert!(statuses.contains(&OverallStatus::Unreadable));
    assert!(statuses.contains(&OverallStatus::Passed));
}
