// src/logging.rs

//! Logging setup for `nightshift` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `NIGHTSHIFT_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Three sinks are installed:
//! - STDERR, so stage stdout passthrough stays readable on a terminal.
//! - `<log_dir>/nightshift.log`: append-only activity log at the chosen level.
//! - `<log_dir>/pipeline_errors.log`: append-only, ERROR events only. Every
//!   failed stage attempt lands here with its attempt context.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, Layer, Registry};

use crate::cli::LogLevel;

/// Activity log file name inside the configured log directory.
pub const ACTIVITY_LOG_FILE: &str = "nightshift.log";

/// Error-only log file name inside the configured log directory.
pub const ERROR_LOG_FILE: &str = "pipeline_errors.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup. When `log_dir` is `None` only the stderr
/// sink is installed.
pub fn init_logging(cli_level: Option<LogLevel>, log_dir: Option<&Path>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("NIGHTSHIFT_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    layers.push(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::from_level(level))
            .boxed(),
    );

    if let Some(dir) = log_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating log dir {:?}", dir))?;

        let activity = open_append(&dir.join(ACTIVITY_LOG_FILE))?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(activity))
                .with_filter(LevelFilter::from_level(level))
                .boxed(),
        );

        let errors = open_append(&dir.join(ERROR_LOG_FILE))?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(errors))
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("installing global tracing subscriber")?;

    Ok(())
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {:?}", path))
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
