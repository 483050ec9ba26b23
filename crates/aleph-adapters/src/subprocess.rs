// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The managed-subprocess [`Worker`] variant: invokes a discovered interpreter,
//! feeds it a JSON document on stdin, streams progress off stderr, and parses
//! a JSON result off stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use aleph_core::{AlephError, JobId};
use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::interpreter::InterpreterResolver;
use crate::worker::{Worker, WorkerOutcome, WorkerProgress};

/// A stderr line is treated as a progress update when it starts with this prefix.
const WARNING_PREFIX: &str = "WARN:";

/// Progress events for a single job are rate-limited to this interval.
const PROGRESS_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Runs a job by launching `{interpreter} {script}` and speaking the
/// stdin/stdout JSON protocol described in the worker runtime contract.
pub struct SubprocessWorker {
    interpreter: InterpreterResolver,
    script: PathBuf,
}

impl SubprocessWorker {
    pub fn new(interpreter: InterpreterResolver, script: impl Into<PathBuf>) -> Self {
        Self { interpreter, script: script.into() }
    }
}

#[async_trait]
impl Worker for SubprocessWorker {
    async fn run(
        &self,
        job_id: &JobId,
        data: &Value,
        progress: mpsc::Sender<WorkerProgress>,
        cancel: CancellationToken,
    ) -> WorkerOutcome {
        let interpreter = match self.interpreter.resolve() {
            Ok(path) => path.to_path_buf(),
            Err(err) => return WorkerOutcome::Failed(err),
        };

        let mut child = match Command::new(&interpreter)
            .arg(&self.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                return WorkerOutcome::Failed(AlephError::WorkerError(format!(
                    "failed to spawn interpreter {}: {err}",
                    interpreter.display()
                )))
            }
        };

        let Some(mut stdin) = child.stdin.take() else {
            return WorkerOutcome::Failed(AlephError::WorkerError("worker stdin unavailable".into()));
        };
        let Some(stdout) = child.stdout.take() else {
            return WorkerOutcome::Failed(AlephError::WorkerError("worker stdout unavailable".into()));
        };
        let Some(stderr) = child.stderr.take() else {
            return WorkerOutcome::Failed(AlephError::WorkerError("worker stderr unavailable".into()));
        };

        let payload = match serde_json::to_vec(data) {
            Ok(bytes) => bytes,
            Err(err) => {
                return WorkerOutcome::Failed(AlephError::WorkerError(format!(
                    "failed to encode job payload: {err}"
                )))
            }
        };
        if let Err(err) = stdin.write_all(&payload).await {
            return WorkerOutcome::Failed(AlephError::WorkerError(format!(
                "failed to write job payload: {err}"
            )));
        }
        drop(stdin);

        let job_id = job_id.clone();
        let stderr_task = tokio::spawn(stream_progress(stderr, job_id.clone(), progress));

        let cancel_task = child.id().map(|pid| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                if let Err(err) = terminate(pid) {
                    warn!(pid, error = %err, "failed to signal cancelled worker");
                }
            })
        });

        let mut stdout_reader = BufReader::new(stdout);
        let mut stdout_buf = String::new();
        let read_result = stdout_reader.read_to_string(&mut stdout_buf).await;
        let _ = stderr_task.await;
        if let Some(cancel_task) = cancel_task {
            cancel_task.abort();
        }

        let status = match child.wait().await {
            Ok(status) => status,
            Err(err) => {
                return WorkerOutcome::Failed(AlephError::WorkerError(format!(
                    "failed to wait on worker process: {err}"
                )))
            }
        };
        if let Err(err) = read_result {
            return WorkerOutcome::Failed(AlephError::WorkerError(format!(
                "failed to read worker stdout: {err}"
            )));
        }

        classify(status, &stdout_buf)
    }
}

/// Sends SIGTERM to the process group, giving the worker a chance to exit
/// cooperatively before the scheduler escalates at `CANCEL_GRACE_MS`.
pub fn terminate(pid: u32) -> Result<(), AlephError> {
    signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
        .map_err(|errno| AlephError::WorkerError(format!("failed to signal worker pid {pid}: {errno}")))
}

async fn stream_progress(
    stderr: tokio::process::ChildStderr,
    job_id: JobId,
    progress: mpsc::Sender<WorkerProgress>,
) {
    let mut lines = BufReader::new(stderr).lines();
    let mut last_sent = None::<Instant>;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(message) = line.strip_prefix(WARNING_PREFIX) else {
                    continue;
                };
                let now = Instant::now();
                if last_sent.is_some_and(|t| now.duration_since(t) < PROGRESS_RATE_LIMIT) {
                    continue;
                }
                last_sent = Some(now);
                if progress
                    .send(WorkerProgress { job_id: job_id.clone(), message: message.trim().to_string() })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(None) => return,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to read worker stderr");
                return;
            }
        }
    }
}

fn classify(status: std::process::ExitStatus, stdout: &str) -> WorkerOutcome {
    let parsed = serde_json::from_str::<Value>(stdout.trim());

    #[cfg(unix)]
    let signalled = std::os::unix::process::ExitStatusExt::signal(&status).is_some();
    #[cfg(not(unix))]
    let signalled = false;

    if status.success() || signalled {
        // Exit 0, or termination by a cooperative signal (e.g. the scheduler's
        // timeout SIGTERM) that still produced complete structured output.
        return match parsed {
            Ok(value) => WorkerOutcome::Completed(value),
            Err(err) if status.success() => {
                WorkerOutcome::Failed(AlephError::OutputParseError(err.to_string()))
            }
            Err(_) => WorkerOutcome::Failed(AlephError::WorkerError(format!(
                "worker terminated by signal with no parseable output: {status}"
            ))),
        };
    }

    WorkerOutcome::Failed(AlephError::WorkerError(format!("worker exited with status {status}")))
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
