// src/config/validate.rs

use std::time::Duration;

use chrono::NaiveTime;

use crate::config::model::{ConfigFile, RawConfigFile, ScheduleSettings, StageSpec};
use crate::errors::{NightshiftError, Result};
use crate::exec::RetryPolicy;
use crate::stage::StageId;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::NightshiftError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let schedule = validate_scheduler(&raw)?;
        let retry = validate_retry(&raw)?;
        validate_stage_keys(&raw)?;
        let stages = resolve_stages(&raw)?;
        validate_housekeeping(&raw)?;

        Ok(ConfigFile {
            schedule,
            retry,
            paths: raw.paths,
            stages,
            monitor: raw.monitor,
            cleanup: raw.cleanup,
        })
    }
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<ScheduleSettings> {
    let run_at = parse_time_of_day(&cfg.scheduler.run_at).map_err(|e| {
        NightshiftError::ConfigError(format!("[scheduler].run_at: {e}"))
    })?;

    let poll_interval = parse_duration(&cfg.scheduler.poll_interval).map_err(|e| {
        NightshiftError::ConfigError(format!("[scheduler].poll_interval: {e}"))
    })?;

    if poll_interval.is_zero() {
        return Err(NightshiftError::ConfigError(
            "[scheduler].poll_interval must be greater than zero".to_string(),
        ));
    }

    Ok(ScheduleSettings {
        run_at,
        poll_interval,
        trigger: cfg.scheduler.trigger,
    })
}

fn validate_retry(cfg: &RawConfigFile) -> Result<RetryPolicy> {
    if cfg.retry.max_retries == 0 {
        return Err(NightshiftError::ConfigError(
            "[retry].max_retries must be >= 1 (got 0)".to_string(),
        ));
    }

    let base_delay = parse_duration(&cfg.retry.base_delay)
        .map_err(|e| NightshiftError::ConfigError(format!("[retry].base_delay: {e}")))?;
    let max_delay = parse_duration(&cfg.retry.max_delay)
        .map_err(|e| NightshiftError::ConfigError(format!("[retry].max_delay: {e}")))?;

    if max_delay < base_delay {
        return Err(NightshiftError::ConfigError(format!(
            "[retry].max_delay ({:?}) must not be smaller than base_delay ({:?})",
            max_delay, base_delay
        )));
    }

    Ok(RetryPolicy::new(cfg.retry.max_retries, base_delay, max_delay))
}

fn validate_stage_keys(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.stage.keys() {
        key.parse::<StageId>()
            .map_err(|e| NightshiftError::ConfigError(format!("[stage.{key}]: {e}")))?;
    }
    Ok(())
}

/// Merge `[default]` and `[stage.<key>]` into one spec per stage, in the
/// fixed execution order.
fn resolve_stages(cfg: &RawConfigFile) -> Result<Vec<StageSpec>> {
    let mut stages = Vec::with_capacity(StageId::ALL.len());

    for id in StageId::ALL {
        let overrides = cfg.stage.get(id.config_key());

        let cmd = overrides
            .and_then(|o| o.cmd.clone())
            .unwrap_or_else(|| id.default_command());

        if cmd.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(NightshiftError::ConfigError(format!(
                "[stage.{}].cmd must name a program",
                id.config_key()
            )));
        }

        let mut env = cfg.default.env.clone();
        if let Some(o) = overrides {
            env.extend(o.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let working_dir = overrides
            .and_then(|o| o.working_dir.clone())
            .or_else(|| cfg.default.working_dir.clone());

        stages.push(StageSpec {
            id,
            cmd,
            env,
            working_dir,
        });
    }

    Ok(stages)
}

fn validate_housekeeping(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cleanup.retention_days == 0 {
        return Err(NightshiftError::ConfigError(
            "[cleanup].retention_days must be >= 1 (got 0)".to_string(),
        ));
    }

    if !(cfg.monitor.max_hours_since_last_run > 0.0) {
        return Err(NightshiftError::ConfigError(
            "[monitor].max_hours_since_last_run must be positive".to_string(),
        ));
    }

    if !(cfg.monitor.stale_lock_hours > 0.0) {
        return Err(NightshiftError::ConfigError(
            "[monitor].stale_lock_hours must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Parse a duration string like `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let scaled_secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled_secs(60),
        "h" => scaled_secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

/// Parse a local time of day, `"HH:MM"` or `"HH:MM:SS"`.
pub fn parse_time_of_day(s: &str) -> std::result::Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| format!("invalid time of day '{s}' (expected HH:MM or HH:MM:SS)"))
}
