// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome shared by a whole pipeline run and by a single stage.
///
/// A run starts as `Success` and is downgraded to `Failed` by the first
/// failed stage; it never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_success(self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// How the scheduler launches a pipeline run.
///
/// - `InProcess`: build an orchestrator and await it on the scheduler's own
///   runtime (default).
/// - `Subprocess`: re-invoke this binary as `nightshift run`, so a crashing
///   run cannot take the scheduler down with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    InProcess,
    Subprocess,
}

impl Default for TriggerMode {
    fn default() -> Self {
        TriggerMode::InProcess
    }
}

impl FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-process" | "inprocess" => Ok(TriggerMode::InProcess),
            "subprocess" => Ok(TriggerMode::Subprocess),
            other => Err(format!(
                "invalid trigger mode: {other} (expected \"in-process\" or \"subprocess\")"
            )),
        }
    }
}

/// Severity of a single health check and of the overall pipeline health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
}

/// Overall verdict of a health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineHealth {
    Healthy,
    Degraded,
    Critical,
}

impl From<CheckStatus> for PipelineHealth {
    fn from(worst: CheckStatus) -> Self {
        match worst {
            CheckStatus::Ok => PipelineHealth::Healthy,
            CheckStatus::Warning => PipelineHealth::Degraded,
            CheckStatus::Critical => PipelineHealth::Critical,
        }
    }
}
