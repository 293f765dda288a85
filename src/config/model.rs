// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::exec::RetryPolicy;
use crate::stage::StageId;
use crate::types::TriggerMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// run_at = "02:00"
/// poll_interval = "30s"
///
/// [retry]
/// max_retries = 3
/// base_delay = "1s"
///
/// [default]
/// env = { PYTHONPATH = "/app" }
///
/// [stage.warehouse_load]
/// cmd = ["python", "scripts/transformation/load_warehouse.py"]
/// ```
///
/// All sections are optional and have defaults matching the production
/// deployment. This is the unvalidated form; convert it into a
/// [`ConfigFile`] with `ConfigFile::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub paths: PathsSection,

    /// Settings applied to every stage from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// Per-stage overrides from `[stage.<key>]`.
    ///
    /// Keys must be one of the fixed stage keys (see [`StageId::config_key`]).
    #[serde(default)]
    pub stage: BTreeMap<String, StageConfig>,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub cleanup: CleanupSection,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Local wall-clock time of the daily run, `"HH:MM"` or `"HH:MM:SS"`.
    #[serde(default = "default_run_at")]
    pub run_at: String,

    /// How often the loop checks whether the run is due (e.g. `"30s"`).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// `"in-process"` (default) or `"subprocess"`.
    #[serde(default)]
    pub trigger: TriggerMode,
}

fn default_run_at() -> String {
    "02:00".to_string()
}

fn default_poll_interval() -> String {
    "30s".to_string()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            run_at: default_run_at(),
            poll_interval: default_poll_interval(),
            trigger: TriggerMode::default(),
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Total number of attempts per stage before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay after the first failed attempt; doubles after each further one.
    #[serde(default = "default_base_delay")]
    pub base_delay: String,

    /// Upper bound for a single backoff delay.
    #[serde(default = "default_max_delay")]
    pub max_delay: String,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> String {
    "1s".to_string()
}

fn default_max_delay() -> String {
    "60s".to_string()
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Where the execution report of the latest run is written.
    #[serde(default = "default_report")]
    pub report: PathBuf,

    /// Lock marker guarding scheduled runs.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Where `nightshift status` writes its health report.
    #[serde(default = "default_monitoring_report")]
    pub monitoring_report: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_report() -> PathBuf {
    PathBuf::from("data/processed/pipeline_execution_report.json")
}

fn default_lock_file() -> PathBuf {
    PathBuf::from("logs/pipeline.lock")
}

fn default_monitoring_report() -> PathBuf {
    PathBuf::from("data/processed/monitoring_report.json")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            report: default_report(),
            lock_file: default_lock_file(),
            monitoring_report: default_monitoring_report(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    /// Extra environment variables for every stage process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for stage processes; inherits ours if `None`.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// `[stage.<key>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageConfig {
    /// Replacement argv; the first element is the program.
    #[serde(default)]
    pub cmd: Option<Vec<String>>,

    /// Merged over `default.env`; stage values win.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Overrides `default.working_dir`.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
    /// A report older than this marks the pipeline critical.
    #[serde(default = "default_max_hours_since_last_run")]
    pub max_hours_since_last_run: f64,

    /// A lock marker older than this is reported as possibly stale.
    #[serde(default = "default_stale_lock_hours")]
    pub stale_lock_hours: f64,
}

fn default_max_hours_since_last_run() -> f64 {
    24.0
}

fn default_stale_lock_hours() -> f64 {
    6.0
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            max_hours_since_last_run: default_max_hours_since_last_run(),
            stale_lock_hours: default_stale_lock_hours(),
        }
    }
}

/// `[cleanup]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSection {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_target_dirs")]
    pub target_dirs: Vec<PathBuf>,

    /// Files whose lowercase name contains any of these are kept.
    #[serde(default = "default_preserve_keywords")]
    pub preserve_keywords: Vec<String>,

    /// Exact file names that are always kept.
    #[serde(default = "default_preserve_files")]
    pub preserve_files: Vec<String>,
}

fn default_retention_days() -> u32 {
    7
}

fn default_target_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("data/raw"),
        PathBuf::from("data/staging"),
        PathBuf::from("logs"),
    ]
}

fn default_preserve_keywords() -> Vec<String> {
    vec!["summary".to_string(), "report".to_string()]
}

fn default_preserve_files() -> Vec<String> {
    vec!["pipeline_execution_report.json".to_string()]
}

impl Default for CleanupSection {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            target_dirs: default_target_dirs(),
            preserve_keywords: default_preserve_keywords(),
            preserve_files: default_preserve_files(),
        }
    }
}

/// Validated scheduler settings.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleSettings {
    pub run_at: NaiveTime,
    pub poll_interval: Duration,
    pub trigger: TriggerMode,
}

/// A fully resolved stage: fixed identity plus effective command line.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub id: StageId,
    pub cmd: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

/// Validated configuration.
///
/// Built from a [`RawConfigFile`] via `TryFrom`; every duration and time has
/// been parsed and `stages` holds all six stages in execution order.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub schedule: ScheduleSettings,
    pub retry: RetryPolicy,
    pub paths: PathsSection,
    pub stages: Vec<StageSpec>,
    pub monitor: MonitorSection,
    pub cleanup: CleanupSection,
}
