use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use nightshift::clock::{Clock, Sleeper};
use nightshift::errors::NightshiftError;
use nightshift::lock::LockFile;
use nightshift::scheduler::{PipelineTrigger, TriggerFuture};
use nightshift::stage::{Stage, StageFuture, StageOutcome};
use nightshift::types::RunStatus;

/// What a [`ScriptedStage`] does on one attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(String),
    /// Behave like a program that could not be spawned.
    SpawnError(String),
}

/// A stage that replays a script of outcomes.
///
/// - each `invoke` pops the next step; once the script is empty the
///   fallback step repeats forever.
/// - invocations are counted, and optionally appended to a shared log so
///   tests can assert on ordering across stages.
///
/// Clones share their state, so keep one clone for assertions and hand the
/// other to the orchestrator.
#[derive(Debug, Clone)]
pub struct ScriptedStage {
    name: String,
    script: Arc<Mutex<VecDeque<Step>>>,
    fallback: Step,
    calls: Arc<AtomicUsize>,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedStage {
    /// Succeeds on every attempt.
    pub fn succeeding(name: &str) -> Self {
        Self::with_fallback(name, Step::Succeed)
    }

    /// Fails on every attempt.
    pub fn always_failing(name: &str, detail: &str) -> Self {
        Self::with_fallback(name, Step::Fail(detail.to_string()))
    }

    pub fn with_fallback(name: &str, fallback: Step) -> Self {
        Self {
            name: name.to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            calls: Arc::new(AtomicUsize::new(0)),
            log: None,
        }
    }

    pub fn then(self, step: Step) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn then_fail(self, detail: &str) -> Self {
        self.then(Step::Fail(detail.to_string()))
    }

    pub fn then_succeed(self) -> Self {
        self.then(Step::Succeed)
    }

    pub fn logging_to(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn invocations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }
}

impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> StageFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name.clone());
        }

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        Box::pin(async move {
            match step {
                Step::Succeed => Ok(StageOutcome::Success),
                Step::Fail(detail) => Ok(StageOutcome::Failed {
                    exit_code: Some(1),
                    detail,
                }),
                Step::SpawnError(msg) => Err(NightshiftError::StageSpawn {
                    stage: "scripted".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, msg),
                }),
            }
        })
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.delays.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}

/// A clock that returns `start`, then moves forward by `step` on every read.
#[derive(Debug, Clone)]
pub struct SteppingClock {
    now: Arc<Mutex<DateTime<Local>>>,
    step: chrono::Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Local>, step: chrono::Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            step,
        }
    }

    /// A clock that never moves unless told to.
    pub fn frozen(at: DateTime<Local>) -> Self {
        Self::new(at, chrono::Duration::zero())
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn peek(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Local> {
        let mut now = self.now.lock().unwrap();
        let current = *now;
        *now = current + self.step;
        current
    }
}

/// What a [`ScriptedTrigger`] does when fired.
#[derive(Debug, Clone)]
pub enum TriggerBehaviour {
    Complete(RunStatus),
    Error(String),
    Panic,
}

/// A pipeline trigger that counts calls and records whether the lock marker
/// was present while it ran.
#[derive(Debug, Clone)]
pub struct ScriptedTrigger {
    behaviour: TriggerBehaviour,
    calls: Arc<AtomicUsize>,
    observed_lock: Option<LockFile>,
    lock_seen: Arc<Mutex<Vec<bool>>>,
}

impl ScriptedTrigger {
    pub fn new(behaviour: TriggerBehaviour) -> Self {
        Self {
            behaviour,
            calls: Arc::new(AtomicUsize::new(0)),
            observed_lock: None,
            lock_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn observing(mut self, lock: LockFile) -> Self {
        self.observed_lock = Some(lock);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// For each call, whether the observed lock was held at that moment.
    pub fn lock_seen(&self) -> Vec<bool> {
        self.lock_seen.lock().unwrap().clone()
    }
}

impl PipelineTrigger for ScriptedTrigger {
    fn trigger(&self) -> TriggerFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(lock) = &self.observed_lock {
            self.lock_seen.lock().unwrap().push(lock.is_locked());
        }

        let behaviour = self.behaviour.clone();
        Box::pin(async move {
            match behaviour {
                TriggerBehaviour::Complete(status) => Ok(status),
                TriggerBehaviour::Error(msg) => Err(anyhow::anyhow!(msg).into()),
                TriggerBehaviour::Panic => panic!("scripted trigger panic"),
            }
        })
    }
}
