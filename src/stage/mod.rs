// src/stage/mod.rs

//! Pipeline stages.
//!
//! A stage is one named unit of pipeline work. The orchestrator only sees the
//! [`Stage`] trait, so a stage can either shell out to an external program
//! ([`CommandStage`]) or call an in-process function ([`FnStage`]) without
//! the orchestrator changing.
//!
//! - [`catalog`] holds the fixed stage order and the built-in commands.
//! - [`command`] runs a stage as a child process.
//! - [`function`] wraps an async closure as a stage.

pub mod catalog;
pub mod command;
pub mod function;

use std::future::Future;
use std::pin::Pin;

use crate::config::ConfigFile;
use crate::errors::Result;

pub use catalog::StageId;
pub use command::CommandStage;
pub use function::FnStage;

/// Result of a single stage attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    /// The attempt ran but reported failure (nonzero exit for processes).
    Failed {
        exit_code: Option<i32>,
        detail: String,
    },
}

impl StageOutcome {
    /// Convenience for in-process stages.
    pub fn failed(detail: impl Into<String>) -> Self {
        StageOutcome::Failed {
            exit_code: None,
            detail: detail.into(),
        }
    }
}

pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<StageOutcome>> + Send + 'a>>;

/// One unit of pipeline work.
///
/// `invoke` runs the stage once from scratch. An `Err` means the attempt
/// could not be carried out at all (e.g. the program could not be spawned);
/// the runner treats it like a failed attempt.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;
    fn invoke(&self) -> StageFuture<'_>;
}

/// Build the production stage list from config, in execution order.
pub fn build_stages(cfg: &ConfigFile) -> Vec<Box<dyn Stage>> {
    cfg.stages
        .iter()
        .map(|spec| Box::new(CommandStage::from_spec(spec)) as Box<dyn Stage>)
        .collect()
}
