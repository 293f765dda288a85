// src/config/mod.rs

//! Configuration loading and validation for nightshift.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Turn the raw model into a validated [`ConfigFile`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    CleanupSection, ConfigFile, DefaultSection, MonitorSection, PathsSection, RawConfigFile,
    RetrySection, ScheduleSettings, SchedulerSection, StageConfig, StageSpec,
};
pub use validate::{parse_duration, parse_time_of_day};
