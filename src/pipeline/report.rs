// src/pipeline/report.rs

//! Execution report data model.
//!
//! Serialized shape (pretty JSON):
//!
//! ```json
//! {
//!   "pipeline_execution_id": "PIPE_20240101_020000",
//!   "start_time": "2024-01-01T02:00:00.123+01:00",
//!   "status": "failed",
//!   "steps_executed": {
//!     "Data Generation": { "status": "success", "duration_seconds": 4.2, "retry_attempts": 0 },
//!     "Data Ingestion": { "status": "failed", "duration_seconds": 3.1, "retry_attempts": 3,
//!                         "error_message": "process exited with status 1" }
//!   },
//!   "end_time": "2024-01-01T02:00:07.456+01:00",
//!   "total_duration_seconds": 7.33
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::RunStatus;

/// Outcome of one stage's full attempt sequence. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: RunStatus,
    pub duration_seconds: f64,
    /// Number of failed attempts (see `StageRunner` for the convention).
    pub retry_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StepResult {
    pub fn success(elapsed: Duration, retry_attempts: u32) -> Self {
        Self {
            status: RunStatus::Success,
            duration_seconds: round_seconds(elapsed.as_secs_f64()),
            retry_attempts,
            error_message: None,
        }
    }

    pub fn failed(elapsed: Duration, retry_attempts: u32, error_message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            duration_seconds: round_seconds(elapsed.as_secs_f64()),
            retry_attempts,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Record of one end-to-end pipeline run.
///
/// Only the orchestrator mutates it. `status` starts as `success` and is
/// downgraded by the first failed step; `end_time` and
/// `total_duration_seconds` are set once by [`finish`](Self::finish).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineExecution {
    #[serde(rename = "pipeline_execution_id")]
    pub execution_id: String,
    pub start_time: DateTime<Local>,
    pub status: RunStatus,
    /// Stage name to result, in execution order.
    pub steps_executed: IndexMap<String, StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_seconds: Option<f64>,
}

impl PipelineExecution {
    pub fn begin(start_time: DateTime<Local>) -> Self {
        Self {
            execution_id: execution_id_for(start_time),
            start_time,
            status: RunStatus::Success,
            steps_executed: IndexMap::new(),
            end_time: None,
            total_duration_seconds: None,
        }
    }

    pub fn record_step(&mut self, name: impl Into<String>, result: StepResult) {
        if !result.is_success() {
            self.status = RunStatus::Failed;
        }
        self.steps_executed.insert(name.into(), result);
    }

    pub fn finish(&mut self, end_time: DateTime<Local>) {
        let elapsed = (end_time - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.end_time = Some(end_time);
        self.total_duration_seconds = Some(round_seconds(elapsed.as_secs_f64()));
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// The step that halted the run, if any.
    pub fn failed_step(&self) -> Option<(&str, &StepResult)> {
        self.steps_executed
            .iter()
            .find(|(_, result)| !result.is_success())
            .map(|(name, result)| (name.as_str(), result))
    }
}

/// `PIPE_<YYYYmmdd>_<HHMMSS>` from the run's start time.
pub fn execution_id_for(start_time: DateTime<Local>) -> String {
    format!("PIPE_{}", start_time.format("%Y%m%d_%H%M%S"))
}

fn round_seconds(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
