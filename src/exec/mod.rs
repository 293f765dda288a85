// src/exec/mod.rs

//! Stage execution layer.
//!
//! - [`retry`] holds the retry ceiling and the pure backoff function.
//! - [`runner`] drives a single [`Stage`](crate::stage::Stage) through its
//!   attempts and produces a [`StepResult`](crate::pipeline::StepResult).

pub mod retry;
pub mod runner;

pub use retry::{backoff, RetryPolicy};
pub use runner::StageRunner;
