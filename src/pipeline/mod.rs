// src/pipeline/mod.rs

//! Pipeline orchestration.
//!
//! - [`report`] defines `PipelineExecution` / `StepResult`.
//! - [`store`] persists the report as JSON.
//! - [`orchestrator`] runs the fixed stage sequence with fail-fast semantics.

pub mod orchestrator;
pub mod report;
pub mod store;

pub use orchestrator::Orchestrator;
pub use report::{execution_id_for, PipelineExecution, StepResult};
pub use store::ReportStore;
