// src/lock.rs

//! File-presence lock guarding against overlapping pipeline runs.
//!
//! This is advisory and best-effort: `is_locked` followed by `acquire` is
//! not atomic, so two scheduler processes polling at the same instant can
//! both proceed. Closing that race needs `create_new` plus an OS advisory
//! lock (flock) or a database-backed lease. There is no staleness
//! detection: a marker left behind by a crashed run blocks every later run
//! until it is removed (`nightshift unlock`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Lock marker at a fixed path. Its content is the owning pid, used for
/// diagnostics only.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff the marker exists.
    pub fn is_locked(&self) -> bool {
        self.fs.exists(&self.path)
    }

    /// Create the marker unconditionally. Call [`is_locked`](Self::is_locked)
    /// first; this never checks.
    pub fn acquire(&self) -> Result<()> {
        let pid = std::process::id().to_string();
        self.fs
            .write(&self.path, pid.as_bytes())
            .with_context(|| format!("creating lock marker {:?}", self.path))?;
        debug!(path = %self.path.display(), pid = %pid, "lock acquired");
        Ok(())
    }

    /// Acquire and return a guard that releases on drop.
    pub fn acquire_guard(&self) -> Result<LockGuard> {
        self.acquire()?;
        Ok(LockGuard {
            lock: Some(self.clone()),
        })
    }

    /// Delete the marker if present. Idempotent.
    pub fn release(&self) -> Result<()> {
        if !self.fs.exists(&self.path) {
            return Ok(());
        }
        self.fs
            .remove_file(&self.path)
            .with_context(|| format!("removing lock marker {:?}", self.path))?;
        debug!(path = %self.path.display(), "lock released");
        Ok(())
    }

    /// Content of the marker (the pid written by `acquire`), if any.
    pub fn holder(&self) -> Option<String> {
        if !self.is_locked() {
            return None;
        }
        self.fs
            .read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// When the marker was written, if it exists.
    pub fn acquired_at(&self) -> Option<SystemTime> {
        if !self.is_locked() {
            return None;
        }
        self.fs.modified(&self.path).ok()
    }
}

/// Releases the lock when dropped, including during panic unwinding.
#[derive(Debug)]
pub struct LockGuard {
    lock: Option<LockFile>,
}

impl LockGuard {
    /// Release now and surface the error instead of only logging it.
    pub fn release(mut self) -> Result<()> {
        match self.lock.take() {
            Some(lock) => lock.release(),
            None => Ok(()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            if let Err(e) = lock.release() {
                warn!(
                    path = %lock.path().display(),
                    error = %e,
                    "failed to release lock marker"
                );
            }
        }
    }
}
