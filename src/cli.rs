// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::TriggerMode;

/// Command-line arguments for `nightshift`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nightshift",
    version,
    about = "Run the nightly ETL pipeline with retries, a lock marker and a daily schedule.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Nightshift.toml` in the current working directory, or the
    /// built-in defaults if that file does not exist.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `NIGHTSHIFT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute the pipeline once now, without taking the lock.
    Run,

    /// Run the daily scheduler loop until Ctrl-C.
    Schedule {
        /// Also fire one guarded run immediately on startup.
        #[arg(long)]
        now: bool,

        /// How runs are started: `in-process` or `subprocess`.
        ///
        /// Overrides `[scheduler] trigger` from the config file.
        #[arg(long, value_name = "MODE")]
        trigger: Option<TriggerMode>,
    },

    /// Print the health report and write it to the monitoring report path.
    Status,

    /// Delete raw, staging and log files older than the retention window.
    Cleanup {
        /// List what would be deleted without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove a leftover lock marker.
    Unlock,

    /// Print the stage order and effective commands, without running them.
    Stages,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
