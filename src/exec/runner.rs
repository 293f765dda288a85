// src/exec/runner.rs

//! Stage runner: one stage, bounded retries, exponential backoff.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::clock::{Sleeper, TokioSleeper};
use crate::pipeline::StepResult;
use crate::stage::{CommandStage, Stage, StageOutcome};

use super::retry::RetryPolicy;

/// Executes stages with retries.
///
/// Counting convention: `StepResult::retry_attempts` is the number of
/// *failed* attempts. Success on the first try reports 0, success after two
/// failures reports 2, and exhaustion reports `max_retries` (every attempt
/// failed).
///
/// Each retry re-runs the stage from scratch. Stages with side effects that
/// are not idempotent (truncate then insert) may leave data in a different
/// state than a single clean run would.
#[derive(Debug, Clone)]
pub struct StageRunner {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl StageRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run an argv-style command as a stage named `name`.
    pub async fn run_command(&self, name: &str, argv: &[String]) -> StepResult {
        let stage = CommandStage::new(name, argv.to_vec());
        self.run_step(&stage).await
    }

    /// Run `stage` until it succeeds or the retry ceiling is reached.
    ///
    /// Never fails: every attempt error is folded into the returned
    /// `StepResult`. Duration covers the whole sequence including sleeps.
    pub async fn run_step(&self, stage: &dyn Stage) -> StepResult {
        let name = stage.name();
        let max_retries = self.policy.max_retries;
        let started = Instant::now();
        let mut failed_attempts: u32 = 0;

        loop {
            let attempt = failed_attempts + 1;
            info!(stage = %name, attempt, max_retries, "starting step");

            let failure = match stage.invoke().await {
                Ok(StageOutcome::Success) => {
                    let result = StepResult::success(started.elapsed(), failed_attempts);
                    info!(
                        stage = %name,
                        duration_seconds = result.duration_seconds,
                        retry_attempts = failed_attempts,
                        "completed step"
                    );
                    return result;
                }
                Ok(StageOutcome::Failed { detail, .. }) => detail,
                Err(err) => err.to_string(),
            };

            failed_attempts += 1;
            error!(
                stage = %name,
                attempt = failed_attempts,
                max_retries,
                error = %failure,
                "step attempt failed"
            );

            if failed_attempts >= max_retries {
                let result = StepResult::failed(started.elapsed(), failed_attempts, failure);
                error!(
                    stage = %name,
                    attempts = failed_attempts,
                    duration_seconds = result.duration_seconds,
                    "step failed after exhausting retries"
                );
                return result;
            }

            let delay = self.policy.backoff(failed_attempts);
            warn!(
                stage = %name,
                attempt = failed_attempts,
                delay_ms = delay.as_millis() as u64,
                "retrying step after backoff"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}

impl Default for StageRunner {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
