//! Crash tests for keeldb
//!
//! Each test aborts the `keeldb` binary at a named point in commit or
//! export and checks the file reopens at a consistent checkpoint.

mod crash;

use crash::*;
use keeldb::{Database, OpenMode};
use tempfile::TempDir;

#[test]
fn test_crash_before_blocks_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crash.keel");
    let c1 = create_with_one_document(&path);
    let len_before = std::fs::metadata(&path).unwrap().len();

    let result = execute_with_crash_point(
        "commit_before_blocks",
        &["put", path.to_str().unwrap(), "second", "2"],
    );
    assert!(result.crashed);

    assert_eq!(std::fs::metadata(&path).unwrap().len(), len_before);
    let db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(!db.is_damaged());
    assert_eq!(db.checkpoint(), c1);
}

#[test]
fn test_crash_between_blocks_and_trailer_recovers_previous_checkpoint() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crash.keel");
    let c1 = create_with_one_document(&path);

    let result = execute_with_crash_point(
        "commit_after_blocks",
        &["put", path.to_str().unwrap(), "second", "2"],
    );
    assert!(result.crashed);
    assert!(std::fs::metadata(&path).unwrap().len() > c1);

    let db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(db.is_damaged());
    assert_eq!(db.checkpoint(), c1);
    assert!(db.contains(b"first"));
    assert!(!db.contains(b"second"));

    // The next commit appends after the orphaned blocks
    let put = response_data(&run_cli(&["put", path.to_str().unwrap(), "third", "3"]));
    let c2 = put["checkpoint"].as_u64().unwrap();
    let db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(!db.is_damaged());
    assert_eq!(db.history(), vec![c2, c1]);
    assert!(!db.contains(b"second"));
}

#[test]
fn test_crash_after_trailer_keeps_commit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crash.keel");
    let c1 = create_with_one_document(&path);

    let result = execute_with_crash_point(
        "commit_after_trailer",
        &["put", path.to_str().unwrap(), "second", "2"],
    );
    assert!(result.crashed);

    let db = Database::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(!db.is_damaged());
    assert_eq!(db.previous_checkpoint(), c1);
    assert_eq!(db.get_document(b"second").unwrap(), Some(serde_json::json!(2)));
}

#[test]
fn test_crash_during_export_leaves_no_target() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crash.keel");
    let target = dir.path().join("exported.keel");
    create_with_one_document(&path);

    let result = execute_with_crash_point(
        "export_before_write",
        &["export", path.to_str().unwrap(), target.to_str().unwrap()],
    );
    assert!(result.crashed);
    assert!(!target.exists());

    let data = response_data(&run_cli(&[
        "export",
        path.to_str().unwrap(),
        target.to_str().unwrap(),
    ]));
    assert_eq!(data["documents"], 1);
    let exported = Database::open(&target, OpenMode::ReadOnly).unwrap();
    assert_eq!(exported.previous_checkpoint(), 0);
}

#[test]
fn test_cli_reports_errors_with_nonzero_exit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.keel");

    let result = run_cli(&["get", path.to_str().unwrap(), "k"]);
    assert!(result.crashed);
    assert!(result.stderr.contains("KEEL_STORAGE_IO_ERROR"));
}
