// src/cleanup.rs

//! Retention cleanup for raw, staging and log files.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Days, Local};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::CleanupSection;
use crate::fs::{walk_files, FileSystem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub scanned: usize,
    /// Files removed (or that would be removed in a dry run).
    pub deleted: usize,
    pub preserved: usize,
    pub failed: usize,
}

/// Deletes files older than the retention window below the target dirs.
///
/// Kept regardless of age: names listed in `preserve_files`, names containing
/// a preserve keyword, files modified today, and protected paths (the lock
/// marker).
#[derive(Debug)]
pub struct RetentionCleaner {
    settings: CleanupSection,
    fs: Arc<dyn FileSystem>,
    protected: Vec<PathBuf>,
}

impl RetentionCleaner {
    pub fn new(settings: CleanupSection, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings,
            fs,
            protected: Vec::new(),
        }
    }

    /// Never touch `path`, whatever its age.
    pub fn protect(mut self, path: impl Into<PathBuf>) -> Self {
        self.protected.push(without_cur_dir(&path.into()));
        self
    }

    pub fn run(&self, now: DateTime<Local>, dry_run: bool) -> CleanupSummary {
        let cutoff = now
            .checked_sub_days(Days::new(u64::from(self.settings.retention_days)))
            .unwrap_or(now);
        let mut summary = CleanupSummary::default();

        info!(
            retention_days = self.settings.retention_days,
            cutoff = %cutoff.to_rfc3339(),
            dry_run,
            "cleanup job started"
        );

        for dir in &self.settings.target_dirs {
            if !self.fs.is_dir(dir) {
                debug!(dir = %dir.display(), "cleanup target missing; skipping");
                continue;
            }

            let files = match walk_files(self.fs.as_ref(), dir) {
                Ok(files) => files,
                Err(e) => {
                    error!(dir = %dir.display(), error = %e, "failed to scan cleanup target");
                    summary.failed += 1;
                    continue;
                }
            };

            for file in files {
                summary.scanned += 1;
                self.process_file(&file, now, cutoff, dry_run, &mut summary);
            }
        }

        info!(
            scanned = summary.scanned,
            deleted = summary.deleted,
            preserved = summary.preserved,
            failed = summary.failed,
            "cleanup job completed"
        );
        summary
    }

    fn process_file(
        &self,
        file: &Path,
        now: DateTime<Local>,
        cutoff: DateTime<Local>,
        dry_run: bool,
        summary: &mut CleanupSummary,
    ) {
        let modified = match self.fs.modified(file) {
            Ok(at) => DateTime::<Local>::from(at),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "cannot read mtime");
                summary.failed += 1;
                return;
            }
        };

        if self.should_preserve(file, modified, now) {
            summary.preserved += 1;
            return;
        }

        if modified >= cutoff {
            return;
        }

        if dry_run {
            info!(file = %file.display(), "would delete old file");
            summary.deleted += 1;
            return;
        }

        match self.fs.remove_file(file) {
            Ok(()) => {
                info!(file = %file.display(), "deleted old file");
                summary.deleted += 1;
            }
            Err(e) => {
                error!(file = %file.display(), error = %e, "failed to delete file");
                summary.failed += 1;
            }
        }
    }

    fn should_preserve(&self, file: &Path, modified: DateTime<Local>, now: DateTime<Local>) -> bool {
        let file_key = without_cur_dir(file);
        if self.protected.iter().any(|p| *p == file_key) {
            return true;
        }

        let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if self.settings.preserve_files.iter().any(|f| f == name) {
            return true;
        }

        let lower = name.to_lowercase();
        if self
            .settings
            .preserve_keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
        {
            return true;
        }

        modified.date_naive() == now.date_naive()
    }
}

/// `./logs/x` and `logs/x` name the same file.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
