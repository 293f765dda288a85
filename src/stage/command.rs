// src/stage/command.rs

//! Stage backed by an external program.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::StageSpec;
use crate::errors::{NightshiftError, Result};

use super::{Stage, StageFuture, StageOutcome};

/// Number of trailing stderr lines kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

/// Runs an argv-style command as a child process.
///
/// Exit code 0 is success, anything else is failure. Stdout is forwarded to
/// the log at info level; stderr at debug level, with the last lines kept
/// for the error message. The process is awaited without a timeout.
#[derive(Debug, Clone)]
pub struct CommandStage {
    name: String,
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
}

impl CommandStage {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            name: name.into(),
            argv,
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn from_spec(spec: &StageSpec) -> Self {
        Self {
            name: spec.id.display_name().to_string(),
            argv: spec.cmd.clone(),
            env: spec.env.clone(),
            working_dir: spec.working_dir.clone(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    async fn run(&self) -> Result<StageOutcome> {
        let (program, args) = self.argv.split_first().ok_or_else(|| {
            NightshiftError::ConfigError(format!("stage '{}' has an empty command", self.name))
        })?;

        info!(
            stage = %self.name,
            cmd = %self.argv.join(" "),
            "starting stage process"
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| NightshiftError::StageSpawn {
            stage: self.name.clone(),
            source,
        })?;

        let stdout_task = child.stdout.take().map(|stdout| {
            let stage = self.name.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stdout);
                while let Some(line) = next_lossy_line(&mut reader).await {
                    info!(stage = %stage, "stdout: {}", line);
                }
            })
        });

        // Always consume stderr so the pipe never fills and blocks the child.
        let stderr_task = child.stderr.take().map(|stderr| {
            let stage = self.name.clone();
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut reader = BufReader::new(stderr);
                while let Some(line) = next_lossy_line(&mut reader).await {
                    debug!(stage = %stage, "stderr: {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of stage '{}'", self.name))?;

        if let Some(handle) = stdout_task {
            let _ = handle.await;
        }
        let tail = match stderr_task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => VecDeque::new(),
        };

        let code = status.code();
        info!(
            stage = %self.name,
            exit_code = code.unwrap_or(-1),
            success = status.success(),
            "stage process exited"
        );

        if status.success() {
            return Ok(StageOutcome::Success);
        }

        Ok(StageOutcome::Failed {
            exit_code: code,
            detail: failure_detail(code, &tail),
        })
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self) -> StageFuture<'_> {
        Box::pin(self.run())
    }
}

/// Next newline-terminated line, with invalid UTF-8 replaced.
///
/// `None` at end of stream or on a read error. Undecodable bytes never stop
/// the reader, so the child cannot block or die on a closed pipe.
async fn next_lossy_line<R>(reader: &mut R) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        Err(e) => {
            debug!(error = %e, "stage output stream closed");
            None
        }
    }
}

fn failure_detail(code: Option<i32>, stderr_tail: &VecDeque<String>) -> String {
    let status = match code {
        Some(code) => format!("process exited with status {code}"),
        None => "process terminated by signal".to_string(),
    };

    if stderr_tail.is_empty() {
        return status;
    }

    let stderr: Vec<&str> = stderr_tail.iter().map(String::as_str).collect();
    format!("{status}: {}", stderr.join("\n"))
}
