// src/scheduler/daemon.rs

//! Cooperative daily scheduler loop.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime};
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ScheduleSettings;
use crate::errors::{NightshiftError, Result};
use crate::lock::LockFile;
use crate::types::RunStatus;

use super::schedule::DailySchedule;
use super::trigger::PipelineTrigger;

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The daily run time has not been reached.
    NotDue,
    /// The run was due but the lock marker was present.
    SkippedLocked,
    /// A run was triggered and reported this status.
    Completed(RunStatus),
    /// The run could not be started or crashed; the lock was released.
    Errored(String),
}

/// Triggers one pipeline run per day at the configured time.
///
/// Idle → (time reached) → check lock → locked: warn and skip; unlocked:
/// acquire → run → release → Idle. Runs are awaited inline, so this loop
/// never overlaps with itself; the lock only protects against a second
/// scheduler process.
pub struct Scheduler<T: PipelineTrigger> {
    schedule: DailySchedule,
    poll_interval: Duration,
    lock: LockFile,
    trigger: T,
    clock: Arc<dyn Clock>,
}

impl<T: PipelineTrigger> Scheduler<T> {
    pub fn new(settings: ScheduleSettings, lock: LockFile, trigger: T) -> Self {
        Self::with_clock(settings, lock, trigger, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: ScheduleSettings,
        lock: LockFile,
        trigger: T,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let schedule = DailySchedule::new(settings.run_at, clock.now().naive_local());
        Self {
            schedule,
            poll_interval: settings.poll_interval,
            lock,
            trigger,
            clock,
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.schedule.next_run()
    }

    pub fn lock(&self) -> &LockFile {
        &self.lock
    }

    /// One poll cycle at `now`.
    pub async fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let now = now.naive_local();
        if !self.schedule.is_due(now) {
            return TickOutcome::NotDue;
        }

        self.schedule.advance(now);
        let outcome = self.run_guarded().await;

        info!(next_run = %self.schedule.next_run(), "next scheduled execution");
        outcome
    }

    /// Run the pipeline once under the lock, skipping if it is held.
    ///
    /// The lock is released on every path. A panic inside the trigger is
    /// caught and reported as `Errored`, so the loop keeps polling.
    pub async fn run_guarded(&self) -> TickOutcome {
        if self.lock.is_locked() {
            let holder = self.lock.holder().unwrap_or_else(|| "unknown".to_string());
            warn!(
                lock = %self.lock.path().display(),
                holder = %holder,
                "pipeline already running; skipping this schedule"
            );
            return TickOutcome::SkippedLocked;
        }

        info!("scheduled pipeline execution started");

        let guard = match self.lock.acquire_guard() {
            Ok(guard) => guard,
            Err(e) => {
                error!(error = %e, "could not create lock marker; skipping run");
                return TickOutcome::Errored(e.to_string());
            }
        };

        let run = AssertUnwindSafe(async { self.trigger.trigger().await })
            .catch_unwind()
            .await;
        let outcome = match run.unwrap_or_else(|panic| Err(panic_error(panic))) {
            Ok(RunStatus::Success) => {
                info!("pipeline execution succeeded");
                TickOutcome::Completed(RunStatus::Success)
            }
            Ok(RunStatus::Failed) => {
                error!("pipeline execution failed");
                TickOutcome::Completed(RunStatus::Failed)
            }
            Err(e) => {
                error!(error = %e, "scheduler error while running pipeline");
                TickOutcome::Errored(e.to_string())
            }
        };

        if let Err(e) = guard.release() {
            error!(error = %e, "failed to release lock marker after run");
        }

        info!("scheduled pipeline execution finished");
        outcome
    }

    /// Poll until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(());
        });

        self.run_until(async move {
            let _ = rx.await;
        })
        .await
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Shutdown is only observed between polls; an in-flight run always
    /// finishes first.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            run_at = %self.schedule.run_at(),
            next_run = %self.schedule.next_run(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "scheduler started; waiting for scheduled execution"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested; stopping scheduler");
                    break;
                }
                _ = interval.tick() => {
                    let now = self.clock.now();
                    let outcome = self.tick(now).await;
                    debug!(?outcome, "scheduler poll");
                }
            }
        }

        info!("scheduler exiting");
        Ok(())
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> NightshiftError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    NightshiftError::Other(anyhow::anyhow!("pipeline run panicked: {message}"))
}
