#![allow(dead_code)]

use std::path::Path;

use nightshift::config::{ConfigFile, RawConfigFile, StageConfig};
use nightshift::errors::Result;
use nightshift::types::TriggerMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Point every path (logs, report, lock, monitoring, cleanup targets)
    /// below `root`, e.g. a `tempfile::TempDir`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let paths = &mut self.config.paths;
        paths.log_dir = root.join("logs");
        paths.report = root.join("data/processed/pipeline_execution_report.json");
        paths.lock_file = root.join("logs/pipeline.lock");
        paths.monitoring_report = root.join("data/processed/monitoring_report.json");

        self.config.cleanup.target_dirs = vec![
            root.join("data/raw"),
            root.join("data/staging"),
            root.join("logs"),
        ];
        self
    }

    pub fn with_run_at(mut self, run_at: &str) -> Self {
        self.config.scheduler.run_at = run_at.to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: &str) -> Self {
        self.config.scheduler.poll_interval = interval.to_string();
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerMode) -> Self {
        self.config.scheduler.trigger = trigger;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: &str) -> Self {
        self.config.retry.base_delay = delay.to_string();
        self
    }

    pub fn with_max_delay(mut self, delay: &str) -> Self {
        self.config.retry.max_delay = delay.to_string();
        self
    }

    pub fn with_default_env(mut self, key: &str, value: &str) -> Self {
        self.config
            .default
            .env
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Override the argv of the stage with config key `key`.
    pub fn with_stage_cmd(mut self, key: &str, argv: &[&str]) -> Self {
        let stage = self.config.stage.entry(key.to_string()).or_default();
        stage.cmd = Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_stage(mut self, key: &str, stage: StageConfig) -> Self {
        self.config.stage.insert(key.to_string(), stage);
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.config.cleanup.retention_days = days;
        self
    }

    pub fn with_stale_lock_hours(mut self, hours: f64) -> Self {
        self.config.monitor.stale_lock_hours = hours;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
