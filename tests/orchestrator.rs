// tests/orchestrator.rs

mod common;
use crate::common::fakes::{RecordingSleeper, ScriptedStage, SteppingClock};
use crate::common::{init_tracing, local, mock_fs};

use std::error::Error;
use std::sync::{Arc, Mutex};

use nightshift::exec::{RetryPolicy, StageRunner};
use nightshift::fs::{FileSystem, RealFileSystem};
use nightshift::pipeline::{Orchestrator, ReportStore};
use nightshift::stage::{Stage, StageId};
use nightshift::types::RunStatus;

type TestResult = Result<(), Box<dyn Error>>;

const REPORT: &str = "data/processed/pipeline_execution_report.json";

fn stage_names() -> Vec<&'static str> {
    StageId::ALL.iter().map(|id| id.display_name()).collect()
}

fn orchestrator(stages: &[ScriptedStage], fs: Arc<dyn FileSystem>) -> Orchestrator {
    let runner = StageRunner::with_sleeper(
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::new()),
    );
    let boxed: Vec<Box<dyn Stage>> = stages.iter().map(ScriptedStage::boxed).collect();
    Orchestrator::new(boxed, runner, ReportStore::new(REPORT, fs))
}

#[tokio::test]
async fn all_stages_succeed() -> TestResult {
    init_tracing();
    let (mock, fs) = mock_fs();
    let stages: Vec<_> = stage_names()
        .into_iter()
        .map(ScriptedStage::succeeding)
        .collect();

    let execution = orchestrator(&stages, fs).execute().await?;

    assert_eq!(execution.status, RunStatus::Success);
    assert_eq!(execution.steps_executed.len(), 6);
    assert!(execution.steps_executed.values().all(|s| s.retry_attempts == 0));
    assert!(execution.failed_step().is_none());

    // Report keys keep execution order.
    let keys: Vec<&str> = execution.steps_executed.keys().map(String::as_str).collect();
    assert_eq!(keys, stage_names());

    assert!(mock.contents(REPORT).is_some(), "report should be persisted");
    Ok(())
}

#[tokio::test]
async fn first_terminal_failure_halts_the_pipeline() -> TestResult {
    init_tracing();
    let (_mock, fs) = mock_fs();
    let log = Arc::new(Mutex::new(Vec::new()));

    let stages: Vec<_> = stage_names()
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let stage = if idx == 2 {
                ScriptedStage::always_failing(name, "transform failed")
            } else {
                ScriptedStage::succeeding(name)
            };
            stage.logging_to(Arc::clone(&log))
        })
        .collect();

    let execution = orchestrator(&stages, fs).execute().await?;

    assert_eq!(execution.status, RunStatus::Failed);
    assert_eq!(execution.steps_executed.len(), 3);

    let (failed_name, failed) = execution.failed_step().expect("a failed step");
    assert_eq!(failed_name, "Staging to Production");
    assert_eq!(failed.retry_attempts, 3);

    for later in &stages[3..] {
        assert_eq!(later.invocations(), 0, "{} must not run", later.name());
    }

    let order = log.lock().unwrap().clone();
    assert_eq!(
        order,
        vec![
            "Data Generation",
            "Data Ingestion",
            "Staging to Production",
            "Staging to Production",
            "Staging to Production",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn report_is_persisted_with_consistent_timing() -> TestResult {
    let (mock, fs) = mock_fs();
    let start = local(2024, 3, 5, 2, 0, 0);
    let clock = SteppingClock::new(start, chrono::Duration::milliseconds(1500));

    let stages = vec![
        ScriptedStage::succeeding("Data Generation"),
        ScriptedStage::always_failing("Data Ingestion", "csv missing"),
    ];
    let orch = orchestrator(&stages, fs).with_clock(Arc::new(clock));

    let execution = orch.execute().await?;

    let raw = mock.contents(REPORT).expect("report written on failure too");
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(json["pipeline_execution_id"], "PIPE_20240305_020000");
    assert_eq!(json["status"], "failed");
    assert!(json["steps_executed"]["Data Generation"].get("error_message").is_none());
    assert_eq!(
        json["steps_executed"]["Data Ingestion"]["error_message"]
            .as_str()
            .map(|m| m.contains("csv missing")),
        Some(true)
    );

    let persisted = orch.store().load()?.expect("report present");
    assert_eq!(persisted, execution);

    let end = persisted.end_time.expect("end_time set");
    assert!(persisted.start_time < end);
    let elapsed = (end - persisted.start_time).num_milliseconds() as f64 / 1000.0;
    let total = persisted.total_duration_seconds.expect("total set");
    assert!((total - elapsed).abs() < 0.01, "total {total} vs elapsed {elapsed}");
    Ok(())
}

#[tokio::test]
async fn execute_fails_only_when_report_cannot_be_written() -> TestResult {
    let dir = tempfile::tempdir()?;
    // A regular file where the report directory should be.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a dir")?;

    let runner = StageRunner::with_sleeper(
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::new()),
    );
    let stage = ScriptedStage::succeeding("Data Generation");
    let orch = Orchestrator::new(
        vec![stage.boxed()],
        runner,
        ReportStore::new(blocker.join("report.json"), Arc::new(RealFileSystem)),
    );

    let result = orch.execute().await;

    assert!(result.is_err(), "expected persistence error");
    assert_eq!(stage.invocations(), 1);
    assert!(!blocker.join("report.json").exists());
    Ok(())
}

#[tokio::test]
async fn report_on_real_filesystem_round_trips() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/report.json");
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let runner = StageRunner::with_sleeper(
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::new()),
    );
    let orch = Orchestrator::new(
        vec![ScriptedStage::succeeding("Data Generation").boxed()],
        runner,
        ReportStore::new(&path, fs),
    );

    let execution = orch.execute().await?;
    let loaded = ReportStore::new(&path, Arc::new(RealFileSystem)).load()?;

    assert_eq!(loaded, Some(execution));
    Ok(())
}
