// src/monitor.rs

//! Health report derived from the persisted execution report and the lock
//! marker.
//!
//! Database-level checks (freshness, volume anomalies) belong to the quality
//! stage; this module only looks at what the orchestrator itself leaves
//! behind.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::MonitorSection;
use crate::lock::LockFile;
use crate::pipeline::{PipelineExecution, ReportStore};
use crate::types::{CheckStatus, PipelineHealth};

/// Result of one named check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

impl CheckResult {
    fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub monitoring_timestamp: DateTime<Local>,
    pub pipeline_health: PipelineHealth,
    pub checks: IndexMap<String, CheckResult>,
}

impl HealthReport {
    fn from_checks(now: DateTime<Local>, checks: IndexMap<String, CheckResult>) -> Self {
        let worst = checks
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Ok);

        Self {
            monitoring_timestamp: now,
            pipeline_health: worst.into(),
            checks,
        }
    }
}

pub struct Monitor {
    store: ReportStore,
    lock: LockFile,
    settings: MonitorSection,
}

impl Monitor {
    pub fn new(store: ReportStore, lock: LockFile, settings: MonitorSection) -> Self {
        Self {
            store,
            lock,
            settings,
        }
    }

    /// Run every check at `now`. Never fails: an unreadable report is itself
    /// a critical finding.
    pub fn check(&self, now: DateTime<Local>) -> HealthReport {
        let mut checks = IndexMap::new();

        match self.store.load() {
            Ok(report) => {
                checks.insert(
                    "last_execution".to_string(),
                    check_last_execution(report.as_ref(), now, self.settings.max_hours_since_last_run),
                );
                checks.insert("last_status".to_string(), check_last_status(report.as_ref()));
            }
            Err(e) => {
                warn!(error = %e, report = %self.store.path().display(), "execution report unreadable");
                checks.insert(
                    "last_execution".to_string(),
                    CheckResult::new(CheckStatus::Critical, format!("execution report unreadable: {e}")),
                );
            }
        }

        let lock_age = self
            .lock
            .acquired_at()
            .map(|at| age_between(DateTime::<Local>::from(at), now));
        checks.insert(
            "lock".to_string(),
            check_lock(self.lock.is_locked(), lock_age, self.lock.holder(), self.settings.stale_lock_hours),
        );

        let report = HealthReport::from_checks(now, checks);
        info!(pipeline_health = ?report.pipeline_health, "health checks completed");
        report
    }
}

/// Critical when there is no finished run within `max_hours`.
pub fn check_last_execution(
    report: Option<&PipelineExecution>,
    now: DateTime<Local>,
    max_hours: f64,
) -> CheckResult {
    let Some(report) = report else {
        return CheckResult::new(CheckStatus::Critical, "no execution report found");
    };

    let Some(end_time) = report.end_time else {
        return CheckResult::new(CheckStatus::Critical, "last execution report has no end time")
            .with("execution_id", json!(report.execution_id));
    };

    let hours_since = hours(age_between(end_time, now));
    let status = if hours_since <= max_hours {
        CheckStatus::Ok
    } else {
        CheckStatus::Critical
    };

    CheckResult::new(status, format!("last run finished {hours_since:.2}h ago"))
        .with("last_run", json!(end_time.to_rfc3339()))
        .with("hours_since_last_run", json!(hours_since))
        .with("threshold_hours", json!(max_hours))
}

/// Critical when the last recorded run failed.
pub fn check_last_status(report: Option<&PipelineExecution>) -> CheckResult {
    let Some(report) = report else {
        return CheckResult::new(CheckStatus::Critical, "no execution report found");
    };

    match report.failed_step() {
        None => CheckResult::new(CheckStatus::Ok, "last run succeeded")
            .with("execution_id", json!(report.execution_id)),
        Some((stage, result)) => CheckResult::new(
            CheckStatus::Critical,
            format!("last run failed at stage '{stage}'"),
        )
        .with("execution_id", json!(report.execution_id))
        .with("failed_stage", json!(stage))
        .with("error_message", json!(result.error_message)),
    }
}

/// Warning when a lock marker has been present longer than `stale_hours`.
pub fn check_lock(
    locked: bool,
    age: Option<Duration>,
    holder: Option<String>,
    stale_hours: f64,
) -> CheckResult {
    if !locked {
        return CheckResult::new(CheckStatus::Ok, "no run in progress");
    }

    let age_hours = age.map(hours);
    let stale = age_hours.is_some_and(|h| h > stale_hours);
    let (status, message) = if stale {
        (
            CheckStatus::Warning,
            "lock marker is older than the stale threshold; a previous run may have crashed",
        )
    } else {
        (CheckStatus::Ok, "run in progress")
    };

    CheckResult::new(status, message)
        .with("holder", json!(holder))
        .with("lock_age_hours", json!(age_hours))
        .with("stale_threshold_hours", json!(stale_hours))
}

fn age_between(then: DateTime<Local>, now: DateTime<Local>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}

fn hours(d: Duration) -> f64 {
    (d.as_secs_f64() / 3600.0 * 100.0).round() / 100.0
}
