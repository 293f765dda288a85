// tests/command_stage.rs

#![cfg(unix)]

mod common;
use crate::common::fakes::RecordingSleeper;
use crate::common::init_tracing;

use std::sync::Arc;

use nightshift::errors::NightshiftError;
use nightshift::exec::{RetryPolicy, StageRunner};
use nightshift::stage::{CommandStage, Stage, StageOutcome};
use nightshift::types::RunStatus;

fn sh(name: &str, script: &str) -> CommandStage {
    CommandStage::new(
        name,
        vec!["sh".to_string(), "-c".to_string(), script.to_string()],
    )
}

#[tokio::test]
async fn zero_exit_is_success() {
    init_tracing();
    let stage = sh("ok", "echo hello from stage");

    let outcome = stage.invoke().await.unwrap();

    assert_eq!(outcome, StageOutcome::Success);
}

#[tokio::test]
async fn nonzero_exit_is_failure_with_stderr_tail() {
    let stage = sh("broken", "echo 'table missing' >&2; exit 3");

    let outcome = stage.invoke().await.unwrap();

    match outcome {
        StageOutcome::Failed { exit_code, detail } => {
            assert_eq!(exit_code, Some(3));
            assert!(detail.contains("status 3"), "detail: {detail}");
            assert!(detail.contains("table missing"), "detail: {detail}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_utf8_output_does_not_kill_the_process() {
    init_tracing();
    // Enough output after the bad byte to overflow the pipe buffer if the
    // reader stopped draining.
    let script = r#"
        printf '\377\n'
        printf '\376 on stderr\n' >&2
        sleep 0.3
        i=0
        while [ $i -lt 20000 ]; do
            echo "row $i"
            echo "warn $i" >&2
            i=$((i+1))
        done
        exit 0
    "#;
    let stage = sh("binary noise", script);

    let outcome = stage.invoke().await.unwrap();

    assert_eq!(outcome, StageOutcome::Success);
}

#[tokio::test]
async fn invalid_utf8_stderr_is_kept_lossily_in_the_tail() {
    let stage = sh("mangled", r#"printf 'bad \377 byte\n' >&2; exit 4"#);

    let outcome = stage.invoke().await.unwrap();

    match outcome {
        StageOutcome::Failed { exit_code, detail } => {
            assert_eq!(exit_code, Some(4));
            assert!(detail.contains("bad \u{FFFD} byte"), "detail: {detail}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let stage = CommandStage::new(
        "ghost",
        vec!["definitely-not-a-real-program-nightshift".to_string()],
    );

    match stage.invoke().await {
        Err(NightshiftError::StageSpawn { stage, .. }) => assert_eq!(stage, "ghost"),
        other => panic!("expected StageSpawn, got {other:?}"),
    }
}

#[tokio::test]
async fn env_and_working_dir_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker"), b"x").unwrap();

    let stage = sh("env", r#"test "$NIGHTSHIFT_STAGE_MODE" = bulk && test -f marker"#)
        .with_env("NIGHTSHIFT_STAGE_MODE", "bulk")
        .with_working_dir(dir.path());

    let outcome = stage.invoke().await.unwrap();

    assert_eq!(outcome, StageOutcome::Success);
}

#[tokio::test]
async fn run_command_retries_a_missing_program_until_exhausted() {
    let sleeper = RecordingSleeper::new();
    let runner = StageRunner::with_sleeper(RetryPolicy::default(), Arc::new(sleeper.clone()));

    let result = runner
        .run_command(
            "Data Generation",
            &["definitely-not-a-real-program-nightshift".to_string()],
        )
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.retry_attempts, 3);
    assert_eq!(sleeper.delays().len(), 2);
    let msg = result.error_message.unwrap();
    assert!(msg.contains("Data Generation"), "message: {msg}");
}

#[tokio::test]
async fn run_command_succeeds_on_a_flaky_script() {
    // Succeeds once the counter file has three lines, i.e. on the third try.
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let script = format!(
        r#"echo x >> "{0}"; test $(wc -l < "{0}") -ge 3"#,
        counter.display()
    );

    let runner = StageRunner::with_sleeper(
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::new()),
    );
    let result = runner
        .run_command("flaky", &["sh".to_string(), "-c".to_string(), script])
        .await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.retry_attempts, 2);
}
