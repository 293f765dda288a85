// src/scheduler/mod.rs

//! Daily scheduling.
//!
//! - [`schedule`] decides when the daily run is due (pure, no IO).
//! - [`trigger`] abstracts how a run is started (in-process or subprocess).
//! - [`daemon`] is the polling loop guarded by the lock marker.

pub mod daemon;
pub mod schedule;
pub mod trigger;

pub use daemon::{Scheduler, TickOutcome};
pub use schedule::DailySchedule;
pub use trigger::{InProcessTrigger, PipelineTrigger, SubprocessTrigger, TriggerFuture};
