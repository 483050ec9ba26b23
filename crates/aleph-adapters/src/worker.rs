// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Worker Runtime contract: anything that can execute a job's payload
//! and report progress/result/error back to the engine.

use aleph_core::{AlephError, JobId};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A progress update emitted while a worker is running, rate-limited to at
/// most one per 100ms by the caller (the engine's runner, not the worker
/// itself — see `aleph-engine::runtime`).
#[derive(Debug, Clone)]
pub struct WorkerProgress {
    pub job_id: JobId,
    pub message: String,
}

/// Outcome of a completed worker invocation.
#[derive(Debug, Clone)]
pub enum WorkerOutcome {
    Completed(Value),
    Failed(AlephError),
}

/// Executes a single job's pipeline logic. Implementations may run in-process
/// (a plain async function) or out-of-process (a managed subprocess speaking
/// line-delimited JSON over stdio). `cancel` is observed cooperatively: a
/// well-behaved worker exits promptly once it fires, and the scheduler
/// escalates to a hard kill after `CANCEL_GRACE_MS` if it doesn't.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn run(
        &self,
        job_id: &JobId,
        data: &Value,
        progress: mpsc::Sender<WorkerProgress>,
        cancel: CancellationToken,
    ) -> WorkerOutcome;
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
