// tests/monitor.rs

mod common;
use crate::common::mock_fs;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use nightshift::config::MonitorSection;
use nightshift::fs::FileSystem;
use nightshift::lock::LockFile;
use nightshift::monitor::{check_lock, HealthReport, Monitor};
use nightshift::pipeline::{PipelineExecution, ReportStore, StepResult};
use nightshift::types::{CheckStatus, PipelineHealth};

const REPORT: &str = "data/processed/pipeline_execution_report.json";
const LOCK: &str = "logs/pipeline.lock";

fn hours_ago(now: DateTime<Local>, hours: i64) -> DateTime<Local> {
    now - chrono::Duration::hours(hours)
}

fn save_run(fs: &Arc<dyn FileSystem>, finished: DateTime<Local>, failing_stage: Option<&str>) {
    let mut execution = PipelineExecution::begin(finished - chrono::Duration::minutes(10));
    execution.record_step("Data Generation", StepResult::success(Duration::from_secs(30), 0));
    if let Some(stage) = failing_stage {
        execution.record_step(
            stage,
            StepResult::failed(Duration::from_secs(3), 3, "process exited with status 1"),
        );
    }
    execution.finish(finished);
    ReportStore::new(REPORT, Arc::clone(fs)).save(&execution).unwrap();
}

fn monitor(fs: &Arc<dyn FileSystem>) -> Monitor {
    Monitor::new(
        ReportStore::new(REPORT, Arc::clone(fs)),
        LockFile::new(LOCK, Arc::clone(fs)),
        MonitorSection::default(),
    )
}

fn status_of(report: &HealthReport, check: &str) -> CheckStatus {
    report.checks[check].status
}

#[test]
fn no_report_is_critical() {
    let (_mock, fs) = mock_fs();

    let report = monitor(&fs).check(Local::now());

    assert_eq!(report.pipeline_health, PipelineHealth::Critical);
    assert_eq!(status_of(&report, "last_execution"), CheckStatus::Critical);
    assert_eq!(status_of(&report, "last_status"), CheckStatus::Critical);
    assert_eq!(status_of(&report, "lock"), CheckStatus::Ok);
}

#[test]
fn recent_successful_run_is_healthy() {
    let (_mock, fs) = mock_fs();
    let now = Local::now();
    save_run(&fs, hours_ago(now, 2), None);

    let report = monitor(&fs).check(now);

    assert_eq!(report.pipeline_health, PipelineHealth::Healthy);
    let last = &report.checks["last_execution"];
    assert_eq!(last.status, CheckStatus::Ok);
    assert_eq!(last.details["hours_since_last_run"], serde_json::json!(2.0));
}

#[test]
fn failed_run_is_critical_and_names_the_stage() {
    let (_mock, fs) = mock_fs();
    let now = Local::now();
    save_run(&fs, hours_ago(now, 1), Some("Warehouse Load"));

    let report = monitor(&fs).check(now);

    assert_eq!(report.pipeline_health, PipelineHealth::Critical);
    assert_eq!(status_of(&report, "last_execution"), CheckStatus::Ok);
    let last_status = &report.checks["last_status"];
    assert_eq!(last_status.status, CheckStatus::Critical);
    assert_eq!(last_status.details["failed_stage"], "Warehouse Load");
}

#[test]
fn stale_report_is_critical() {
    let (_mock, fs) = mock_fs();
    let now = Local::now();
    save_run(&fs, hours_ago(now, 30), None);

    let report = monitor(&fs).check(now);

    assert_eq!(status_of(&report, "last_execution"), CheckStatus::Critical);
    assert_eq!(report.pipeline_health, PipelineHealth::Critical);
}

#[test]
fn old_lock_marker_degrades_health() {
    let (mock, fs) = mock_fs();
    let now = Local::now();
    save_run(&fs, hours_ago(now, 3), None);
    mock.add_file_with_mtime(LOCK, "4242", SystemTime::now() - Duration::from_secs(8 * 3600));

    let report = monitor(&fs).check(now);

    assert_eq!(status_of(&report, "lock"), CheckStatus::Warning);
    assert_eq!(report.checks["lock"].details["holder"], "4242");
    assert_eq!(report.pipeline_health, PipelineHealth::Degraded);
}

#[test]
fn fresh_lock_marker_is_a_run_in_progress() {
    let (mock, fs) = mock_fs();
    let now = Local::now();
    save_run(&fs, hours_ago(now, 3), None);
    mock.add_file_with_mtime(LOCK, "4242", SystemTime::now() - Duration::from_secs(600));

    let report = monitor(&fs).check(now);

    assert_eq!(status_of(&report, "lock"), CheckStatus::Ok);
    assert_eq!(report.pipeline_health, PipelineHealth::Healthy);
}

#[test]
fn unreadable_report_is_critical() {
    let (mock, fs) = mock_fs();
    mock.add_file(REPORT, "{ not json");

    let report = monitor(&fs).check(Local::now());

    assert_eq!(status_of(&report, "last_execution"), CheckStatus::Critical);
    assert_eq!(report.pipeline_health, PipelineHealth::Critical);
}

#[test]
fn check_lock_thresholds() {
    let stale = check_lock(true, Some(Duration::from_secs(7 * 3600)), Some("1".into()), 6.0);
    assert_eq!(stale.status, CheckStatus::Warning);

    let fresh = check_lock(true, Some(Duration::from_secs(3600)), Some("1".into()), 6.0);
    assert_eq!(fresh.status, CheckStatus::Ok);

    let absent = check_lock(false, None, None, 6.0);
    assert_eq!(absent.status, CheckStatus::Ok);
}

#[test]
fn health_report_serializes_flat_check_details() {
    let (_mock, fs) = mock_fs();
    let now = Local::now();
    save_run(&fs, hours_ago(now, 1), Some("Data Ingestion"));

    let report = monitor(&fs).check(now);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["pipeline_health"], "critical");
    assert_eq!(json["checks"]["last_status"]["status"], "critical");
    assert_eq!(json["checks"]["last_status"]["failed_stage"], "Data Ingestion");
    assert_eq!(json["checks"]["lock"]["status"], "ok");
    assert!(json["monitoring_timestamp"].is_string());
}
