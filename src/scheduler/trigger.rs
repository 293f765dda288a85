// src/scheduler/trigger.rs

//! How the scheduler starts one pipeline run.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{anyhow, Context};
use tokio::process::Command;
use tracing::info;

use crate::errors::Result;
use crate::pipeline::Orchestrator;
use crate::types::RunStatus;

pub type TriggerFuture<'a> = Pin<Box<dyn Future<Output = Result<RunStatus>> + Send + 'a>>;

/// Starts one pipeline run and reports its overall status.
///
/// `Err` means the run could not be carried out or crashed; the scheduler
/// logs it and moves on to the next day.
pub trait PipelineTrigger: Send + Sync {
    fn trigger(&self) -> TriggerFuture<'_>;
}

impl<T: PipelineTrigger + ?Sized> PipelineTrigger for Box<T> {
    fn trigger(&self) -> TriggerFuture<'_> {
        (**self).trigger()
    }
}

/// Runs the orchestrator on the scheduler's own runtime.
pub struct InProcessTrigger {
    orchestrator: Orchestrator,
}

impl InProcessTrigger {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

impl PipelineTrigger for InProcessTrigger {
    fn trigger(&self) -> TriggerFuture<'_> {
        Box::pin(async move {
            let execution = self.orchestrator.execute().await?;
            Ok(execution.status)
        })
    }
}

/// Launches `nightshift run` as a child process.
///
/// Exit code 0 is a successful run and 1 a failed run (report written);
/// anything else means the orchestrator itself broke and is returned as an
/// error. Output is inherited so the child's logs stay visible.
#[derive(Debug, Clone)]
pub struct SubprocessTrigger {
    program: PathBuf,
    args: Vec<String>,
}

impl SubprocessTrigger {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invoke the current executable with `run`, forwarding `--config`.
    pub fn current_exe(config: Option<PathBuf>) -> Result<Self> {
        let program = std::env::current_exe().context("locating current executable")?;
        let mut args = Vec::new();
        if let Some(path) = config {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        args.push("run".to_string());
        Ok(Self::new(program, args))
    }

    async fn launch(&self) -> Result<RunStatus> {
        info!(
            program = %self.program.display(),
            args = ?self.args,
            "launching pipeline process"
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("spawning pipeline process {:?}", self.program))?;

        match status.code() {
            Some(0) => Ok(RunStatus::Success),
            Some(1) => Ok(RunStatus::Failed),
            Some(code) => Err(anyhow!("pipeline process exited with status {code}").into()),
            None => Err(anyhow!("pipeline process terminated by signal").into()),
        }
    }
}

impl PipelineTrigger for SubprocessTrigger {
    fn trigger(&self) -> TriggerFuture<'_> {
        Box::pin(self.launch())
    }
}
