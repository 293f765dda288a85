// src/pipeline/store.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::errors::Result;
use crate::fs::FileSystem;

use super::report::PipelineExecution;

/// Persists the execution report of the latest run at a fixed path.
///
/// Each save overwrites the previous report.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, execution: &PipelineExecution) -> Result<()> {
        let json = serde_json::to_vec_pretty(execution)?;
        self.fs
            .write(&self.path, &json)
            .with_context(|| format!("writing execution report {:?}", self.path))?;
        Ok(())
    }

    /// Load the latest report, or `None` if no run has been recorded yet.
    pub fn load(&self) -> Result<Option<PipelineExecution>> {
        if !self.fs.exists(&self.path) {
            return Ok(None);
        }
        let contents = self.fs.read_to_string(&self.path)?;
        let execution = serde_json::from_str(&contents)?;
        Ok(Some(execution))
    }
}
