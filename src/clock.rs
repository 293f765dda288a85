// src/clock.rs

//! Time sources injected into the runner, orchestrator and scheduler.
//!
//! Production code uses [`SystemClock`] and [`TokioSleeper`]. Tests swap in
//! fakes so that backoff delays and report timestamps are deterministic.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Wall-clock reads for report timestamps and schedule decisions.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Local>;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Suspends the current task between retry attempts.
pub trait Sleeper: Send + Sync + Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Sleeps on the Tokio timer, so paused-clock tests advance instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
