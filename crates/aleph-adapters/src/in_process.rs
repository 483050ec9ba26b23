// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-process [`Worker`] variant: wraps a plain async closure so a
//! pipeline can run inline without paying subprocess overhead.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use aleph_core::JobId;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::worker::{Worker, WorkerOutcome, WorkerProgress};

type BoxFuture = Pin<Box<dyn Future<Output = WorkerOutcome> + Send>>;
type RunFn = dyn Fn(JobId, Value, mpsc::Sender<WorkerProgress>, CancellationToken) -> BoxFuture + Send + Sync;

/// A worker backed by an in-process function. The function receives the
/// job id, its data payload, the progress sender, and a cancellation token —
/// all at its own discretion (the 100ms progress rate limit is the caller's
/// responsibility for subprocess workers; in-process workers are trusted to
/// self-limit, and to check `cancel.is_cancelled()` at safe points).
pub struct FunctionWorker {
    run: Arc<RunFn>,
}

impl FunctionWorker {
    pub fn new<F, Fut>(run: F) -> Self
    where
        F: Fn(JobId, Value, mpsc::Sender<WorkerProgress>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkerOutcome> + Send + 'static,
    {
        Self {
            run: Arc::new(move |job_id, data, progress, _cancel| Box::pin(run(job_id, data, progress))),
        }
    }

    /// Like [`Self::new`], but the closure also receives the cancellation
    /// token, for workers that want to observe it mid-run.
    pub fn new_cancellable<F, Fut>(run: F) -> Self
    where
        F: Fn(JobId, Value, mpsc::Sender<WorkerProgress>, CancellationToken) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = WorkerOutcome> + Send + 'static,
    {
        Self { run: Arc::new(move |job_id, data, progress, cancel| Box::pin(run(job_id, data, progress, cancel))) }
    }
}

#[async_trait]
impl Worker for FunctionWorker {
    async fn run(
        &self,
        job_id: &JobId,
        data: &Value,
        progress: mpsc::Sender<WorkerProgress>,
        cancel: CancellationToken,
    ) -> WorkerOutcome {
        (self.run)(job_id.clone(), data.clone(), progress, cancel).await
    }
}

#[cfg(test)]
#[path = "in_process_tests.rs"]
mod tests;
