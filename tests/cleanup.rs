// tests/cleanup.rs

mod common;
use crate::common::{local, mock_fs};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use nightshift::cleanup::{CleanupSummary, RetentionCleaner};
use nightshift::config::CleanupSection;
use nightshift::fs::mock::MockFileSystem;
use nightshift::fs::FileSystem;

fn now() -> DateTime<Local> {
    local(2024, 6, 10, 12, 0, 0)
}

fn days_ago(days: i64) -> SystemTime {
    SystemTime::from(now() - chrono::Duration::days(days))
}

fn settings() -> CleanupSection {
    CleanupSection {
        retention_days: 7,
        target_dirs: vec![
            PathBuf::from("data/raw"),
            PathBuf::from("data/staging"),
            PathBuf::from("logs"),
        ],
        ..CleanupSection::default()
    }
}

fn present(mock: &MockFileSystem, path: &str) -> bool {
    mock.exists(Path::new(path))
}

#[test]
fn deletes_old_files_and_keeps_recent_ones() {
    let (mock, fs) = mock_fs();
    mock.add_file_with_mtime("data/raw/orders_20240501.csv", "x", days_ago(40));
    mock.add_file_with_mtime("data/staging/batch/customers.csv", "x", days_ago(8));
    mock.add_file_with_mtime("data/raw/orders_20240608.csv", "x", days_ago(2));

    let summary = RetentionCleaner::new(settings(), fs).run(now(), false);

    assert_eq!(
        summary,
        CleanupSummary {
            scanned: 3,
            deleted: 2,
            preserved: 0,
            failed: 0,
        }
    );
    assert!(!present(&mock, "data/raw/orders_20240501.csv"));
    assert!(!present(&mock, "data/staging/batch/customers.csv"));
    assert!(present(&mock, "data/raw/orders_20240608.csv"));
}

#[test]
fn preserve_rules_win_over_age() {
    let (mock, fs) = mock_fs();
    mock.add_file_with_mtime("data/raw/Weekly_Summary.csv", "x", days_ago(30));
    mock.add_file_with_mtime("logs/pipeline_execution_report.json", "{}", days_ago(30));
    mock.add_file_with_mtime("logs/quality_report_may.json", "{}", days_ago(30));
    mock.add_file_with_mtime("logs/old.log", "x", days_ago(30));

    let summary = RetentionCleaner::new(settings(), fs).run(now(), false);

    assert_eq!(summary.preserved, 3);
    assert_eq!(summary.deleted, 1);
    assert!(present(&mock, "data/raw/Weekly_Summary.csv"));
    assert!(present(&mock, "logs/pipeline_execution_report.json"));
    assert!(present(&mock, "logs/quality_report_may.json"));
    assert!(!present(&mock, "logs/old.log"));
}

#[test]
fn files_modified_today_are_preserved() {
    let (mock, fs) = mock_fs();
    let this_morning = SystemTime::from(local(2024, 6, 10, 0, 30, 0));
    mock.add_file_with_mtime("logs/nightshift.log", "x", this_morning);

    let summary = RetentionCleaner::new(settings(), fs).run(now(), false);

    assert_eq!(summary.preserved, 1);
    assert!(present(&mock, "logs/nightshift.log"));
}

#[test]
fn protected_lock_marker_is_never_deleted() {
    let (mock, fs) = mock_fs();
    mock.add_file_with_mtime("logs/pipeline.lock", "99", days_ago(20));

    let summary = RetentionCleaner::new(settings(), fs)
        .protect("logs/pipeline.lock")
        .run(now(), false);

    assert_eq!(summary.deleted, 0);
    assert!(present(&mock, "logs/pipeline.lock"));
}

#[test]
fn protected_path_matches_regardless_of_leading_dot() {
    let (mock, fs) = mock_fs();
    mock.add_file_with_mtime("logs/pipeline.lock", "99", days_ago(20));
    mock.add_file_with_mtime("logs/old.log", "x", days_ago(20));

    let summary = RetentionCleaner::new(settings(), fs)
        .protect("./logs/pipeline.lock")
        .run(now(), false);

    assert_eq!(summary.preserved, 1);
    assert_eq!(summary.deleted, 1);
    assert!(present(&mock, "logs/pipeline.lock"));
    assert!(!present(&mock, "logs/old.log"));
}

#[test]
fn dry_run_deletes_nothing() {
    let (mock, fs) = mock_fs();
    mock.add_file_with_mtime("data/raw/old.csv", "x", days_ago(10));

    let summary = RetentionCleaner::new(settings(), fs).run(now(), true);

    assert_eq!(summary.deleted, 1);
    assert!(present(&mock, "data/raw/old.csv"));
}

#[test]
fn delete_failures_are_counted_not_fatal() {
    let (mock, fs) = mock_fs();
    mock.add_file_with_mtime("data/raw/stuck.csv", "x", days_ago(10));
    mock.add_file_with_mtime("data/raw/gone.csv", "x", days_ago(10));
    mock.deny_removal("data/raw/stuck.csv");

    let summary = RetentionCleaner::new(settings(), fs).run(now(), false);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.deleted, 1);
    assert!(present(&mock, "data/raw/stuck.csv"));
    assert!(!present(&mock, "data/raw/gone.csv"));
}

#[test]
fn missing_target_dirs_are_skipped() {
    let (_mock, fs) = mock_fs();

    let summary = RetentionCleaner::new(settings(), fs).run(now(), false);

    assert_eq!(summary, CleanupSummary::default());
}
