// src/stage/function.rs

use std::future::Future;

use crate::errors::Result;

use super::{Stage, StageFuture, StageOutcome};

/// Stage backed by an in-process async function.
///
/// The closure is called once per attempt, so retries re-run it from scratch
/// exactly like a re-spawned process.
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnStage<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<StageOutcome>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> Stage for FnStage<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<StageOutcome>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> StageFuture<'_> {
        Box::pin((self.f)())
    }
}
