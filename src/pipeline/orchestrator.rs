// src/pipeline/orchestrator.rs

use std::sync::Arc;

use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::StageRunner;
use crate::fs::FileSystem;
use crate::stage::{build_stages, Stage};

use super::report::PipelineExecution;
use super::store::ReportStore;

/// Drives the fixed stage sequence and produces the execution report.
///
/// - Stages run strictly in order; a stage starts only after the previous
///   stage's retry sequence has terminated.
/// - The first stage that fails terminally halts the run (fail-fast).
/// - The report is persisted on every path, including failure.
///
/// The orchestrator takes no lock; single-flight is the scheduler's job.
pub struct Orchestrator {
    stages: Vec<Box<dyn Stage>>,
    runner: StageRunner,
    store: ReportStore,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(stages: Vec<Box<dyn Stage>>, runner: StageRunner, store: ReportStore) -> Self {
        Self {
            stages,
            runner,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Production wiring: subprocess stages from config, report on `fs`.
    pub fn from_config(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Self {
        Self::new(
            build_stages(cfg),
            StageRunner::new(cfg.retry),
            ReportStore::new(&cfg.paths.report, fs),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Run every stage in order and persist the report.
    ///
    /// Stage failures are reported through the returned record's `status`;
    /// the only error is failing to persist the report.
    pub async fn execute(&self) -> Result<PipelineExecution> {
        let mut execution = PipelineExecution::begin(self.clock.now());

        info!(
            execution_id = %execution.execution_id,
            stages = self.stages.len(),
            "pipeline execution started"
        );

        for stage in &self.stages {
            let result = self.runner.run_step(stage.as_ref()).await;
            let halted = !result.is_success();
            execution.record_step(stage.name(), result);

            if halted {
                error!(
                    execution_id = %execution.execution_id,
                    stage = %stage.name(),
                    "stage failed terminally; halting pipeline"
                );
                break;
            }
        }

        execution.finish(self.clock.now());
        self.store.save(&execution)?;

        info!(
            execution_id = %execution.execution_id,
            status = %execution.status,
            steps = execution.steps_executed.len(),
            total_duration_seconds = execution.total_duration_seconds.unwrap_or_default(),
            report = %self.store.path().display(),
            "pipeline execution finished"
        );

        Ok(execution)
    }
}
