// src/lib.rs

pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod lock;
pub mod logging;
pub mod monitor;
pub mod pipeline;
pub mod scheduler;
pub mod stage;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::cleanup::RetentionCleaner;
use crate::cli::{CliArgs, Command};
use crate::config::ConfigFile;
use crate::fs::{FileSystem, RealFileSystem};
use crate::lock::LockFile;
use crate::monitor::Monitor;
use crate::pipeline::{Orchestrator, ReportStore};
use crate::scheduler::{InProcessTrigger, PipelineTrigger, Scheduler, SubprocessTrigger};
use crate::types::{PipelineHealth, TriggerMode};

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: `0` on success, `1` when a pipeline run
/// failed or the health report is critical.
pub async fn run(args: CliArgs, cfg: ConfigFile) -> Result<i32> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    match args.command {
        Command::Run => run_once(&cfg, fs).await,
        Command::Schedule { now, trigger } => {
            let mode = trigger.unwrap_or(cfg.schedule.trigger);
            run_scheduler(&cfg, fs, mode, now, args.config).await?;
            Ok(0)
        }
        Command::Status => write_status(&cfg, fs),
        Command::Cleanup { dry_run } => {
            let summary = RetentionCleaner::new(cfg.cleanup.clone(), fs)
                .protect(&cfg.paths.lock_file)
                .run(Local::now(), dry_run);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(if summary.failed > 0 { 1 } else { 0 })
        }
        Command::Unlock => {
            unlock(&cfg, fs)?;
            Ok(0)
        }
        Command::Stages => {
            print_stages(&cfg);
            Ok(0)
        }
    }
}

/// Direct invocation: no lock, mirrors running the orchestrator by hand.
async fn run_once(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<i32> {
    let orchestrator = Orchestrator::from_config(cfg, fs);
    let execution = orchestrator
        .execute()
        .await
        .context("running pipeline")?;

    Ok(if execution.status.is_success() { 0 } else { 1 })
}

async fn run_scheduler(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    mode: TriggerMode,
    fire_now: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let trigger: Box<dyn PipelineTrigger> = match mode {
        TriggerMode::InProcess => Box::new(InProcessTrigger::new(Orchestrator::from_config(
            cfg,
            fs.clone(),
        ))),
        TriggerMode::Subprocess => Box::new(SubprocessTrigger::current_exe(config_path)?),
    };

    let lock = LockFile::new(&cfg.paths.lock_file, fs);
    let scheduler = Scheduler::new(cfg.schedule, lock, trigger);

    if fire_now {
        info!("--now given; running pipeline immediately");
        let outcome = scheduler.run_guarded().await;
        debug!(?outcome, "immediate run finished");
    }

    scheduler.run().await?;
    Ok(())
}

fn write_status(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<i32> {
    let monitor = Monitor::new(
        ReportStore::new(&cfg.paths.report, fs.clone()),
        LockFile::new(&cfg.paths.lock_file, fs.clone()),
        cfg.monitor.clone(),
    );
    let report = monitor.check(Local::now());
    let json = serde_json::to_string_pretty(&report)?;

    fs.write(&cfg.paths.monitoring_report, json.as_bytes())
        .with_context(|| format!("writing monitoring report {:?}", cfg.paths.monitoring_report))?;
    println!("{json}");

    Ok(match report.pipeline_health {
        PipelineHealth::Critical => 1,
        PipelineHealth::Healthy | PipelineHealth::Degraded => 0,
    })
}

fn unlock(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<()> {
    let lock = LockFile::new(&cfg.paths.lock_file, fs);

    if !lock.is_locked() {
        println!("no lock marker at {}", lock.path().display());
        return Ok(());
    }

    let holder = lock.holder().unwrap_or_else(|| "unknown".to_string());
    warn!(
        lock = %lock.path().display(),
        holder = %holder,
        "removing lock marker"
    );
    lock.release()?;
    println!("removed {}", lock.path().display());

    Ok(())
}

/// Dry-run output: stage order and effective commands.
fn print_stages(cfg: &ConfigFile) {
    println!("nightshift stages");
    println!("  schedule.run_at = {}", cfg.schedule.run_at);
    println!("  schedule.trigger = {:?}", cfg.schedule.trigger);
    println!(
        "  retry = {} attempts, base {:?}, max {:?}",
        cfg.retry.max_retries, cfg.retry.base_delay, cfg.retry.max_delay
    );
    println!();

    println!("stages ({}):", cfg.stages.len());
    for (idx, spec) in cfg.stages.iter().enumerate() {
        println!("  {}. {} [{}]", idx + 1, spec.id, spec.id.config_key());
        println!("      cmd: {}", spec.cmd.join(" "));
        if !spec.env.is_empty() {
            println!("      env: {:?}", spec.env);
        }
        if let Some(ref dir) = spec.working_dir {
            println!("      working_dir: {}", dir.display());
        }
    }

    debug!("stage listing complete (no execution)");
}
