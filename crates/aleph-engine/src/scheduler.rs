// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler / Queue: admits queued jobs under the global concurrency gate,
//! runs them via the Worker Runtime, and applies the retry/circuit-breaker
//! policy on failure.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use aleph_core::{AlephError, Clock, Event, Job, JobError, JobId};
use aleph_storage::JobStore;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bus::EventBus;
use crate::registry::PipelineRegistry;
use crate::runner;
use crate::runtime::gate::Gate;

/// Per-pipeline FIFO queues plus the round-robin order used to pick the next
/// pipeline to admit from, so no single pipeline can starve the others.
#[derive(Default)]
struct Queues {
    by_pipeline: HashMap<String, VecDeque<JobId>>,
    round_robin: VecDeque<String>,
}

impl Queues {
    fn push(&mut self, pipeline_id: &str, job_id: JobId) {
        let queue = self.by_pipeline.entry(pipeline_id.to_string()).or_default();
        if queue.is_empty() && !self.round_robin.contains(&pipeline_id.to_string()) {
            self.round_robin.push_back(pipeline_id.to_string());
        }
        queue.push_back(job_id);
    }

    fn remove(&mut self, pipeline_id: &str, job_id: &JobId) -> bool {
        if let Some(queue) = self.by_pipeline.get_mut(pipeline_id) {
            let before = queue.len();
            queue.retain(|id| id != job_id);
            return queue.len() != before;
        }
        false
    }

    /// Rotates through pipelines with a non-empty queue, returning the next
    /// head-of-line job to try admitting.
    fn next(&mut self) -> Option<(String, JobId)> {
        let rounds = self.round_robin.len();
        for _ in 0..rounds {
            let pipeline_id = self.round_robin.pop_front()?;
            let job = self.by_pipeline.get_mut(&pipeline_id).and_then(|q| q.front().cloned());
            match job {
                Some(job_id) => {
                    self.round_robin.push_back(pipeline_id.clone());
                    return Some((pipeline_id, job_id));
                }
                None => {
                    self.by_pipeline.remove(&pipeline_id);
                }
            }
        }
        None
    }

    fn pop_admitted(&mut self, pipeline_id: &str) {
        if let Some(queue) = self.by_pipeline.get_mut(pipeline_id) {
            queue.pop_front();
        }
    }
}

/// Coordinates admission, retries, and cancellation for every registered
/// pipeline. Cheap to clone — internal state lives behind `Arc`.
pub struct Scheduler<C: Clock + 'static> {
    store: Arc<dyn JobStore>,
    registry: Arc<PipelineRegistry>,
    bus: EventBus,
    gate: Arc<Gate>,
    clock: C,
    queues: Arc<Mutex<Queues>>,
    cancels: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    pending_retries: Arc<Mutex<HashMap<JobId, u32>>>,
    wakeup: Arc<Notify>,
}

impl<C: Clock + 'static> Clone for Scheduler<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            bus: self.bus.clone_sender(),
            gate: Arc::clone(&self.gate),
            clock: self.clock.clone(),
            queues: Arc::clone(&self.queues),
            cancels: Arc::clone(&self.cancels),
            pending_retries: Arc::clone(&self.pending_retries),
            wakeup: Arc::clone(&self.wakeup),
        }
    }
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<PipelineRegistry>,
        bus: EventBus,
        gate: Arc<Gate>,
        clock: C,
    ) -> Self {
        Self {
            store,
            registry,
            bus,
            gate,
            clock,
            queues: Arc::new(Mutex::new(Queues::default())),
            cancels: Arc::new(Mutex::new(HashMap::new())),
            pending_retries: Arc::new(Mutex::new(HashMap::new())),
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// Attempt numbers of retries currently scheduled (backed off, not yet
    /// re-admitted) — the raw material for the Status Aggregator's global
    /// `retryMetrics` bucketing.
    pub fn pending_retry_attempts(&self) -> Vec<u32> {
        self.pending_retries.lock().values().copied().collect()
    }

    /// Inserts a job into its pipeline's FIFO and emits `job:created`.
    pub async fn enqueue(&self, job: Job) -> Result<(), AlephError> {
        self.registry.resolve(&job.pipeline_id)?;
        self.store.insert(&job).await?;
        self.queues.lock().push(&job.pipeline_id, job.id.clone());
        self.bus.publish(Event::JobCreated { job_id: job.id, pipeline_id: job.pipeline_id }).await;
        self.wakeup.notify_one();
        Ok(())
    }

    /// Cancels a job. Queued jobs are removed and transitioned directly;
    /// running jobs have their cancellation token set and are escalated by
    /// the runner if they haven't exited within `CANCEL_GRACE_MS`.
    pub async fn cancel(&self, job_id: &JobId) -> Result<(), AlephError> {
        let job = self.store.get(job_id).await?.ok_or_else(|| AlephError::NotFound(job_id.to_string()))?;
        match job.status {
            aleph_core::JobStatus::Queued => {
                self.queues.lock().remove(&job.pipeline_id, job_id);
                let now = self.clock.epoch_ms();
                let cancelled = self
                    .store
                    .transition(job_id, Box::new(move |j| j.cancel(now)))
                    .await?;
                self.bus
                    .publish(Event::JobCancelled { job_id: cancelled.id, pipeline_id: cancelled.pipeline_id })
                    .await;
                Ok(())
            }
            aleph_core::JobStatus::Running => {
                let token = self.cancels.lock().get(job_id).cloned();
                match token {
                    Some(token) => {
                        token.cancel();
                        Ok(())
                    }
                    None => Err(AlephError::NotCancellable(job_id.to_string())),
                }
            }
            _ => Err(AlephError::NotCancellable(job_id.to_string())),
        }
    }

    /// Drives the admission loop until `shutdown` fires. Intended to be
    /// spawned once at daemon startup.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            while let Some(permit_job) = self.try_admit_next() {
                self.spawn_attempt(permit_job);
            }
            tokio::select! {
                _ = self.wakeup.notified() => {}
                _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
                _ = shutdown.cancelled() => return,
            }
        }
    }

    fn try_admit_next(&self) -> Option<(String, JobId, crate::runtime::gate::GatePermit)> {
        let (pipeline_id, job_id) = {
            let mut queues = self.queues.lock();
            queues.next()?
        };
        let permit = self.gate.try_admit(&pipeline_id)?;
        self.queues.lock().pop_admitted(&pipeline_id);
        Some((pipeline_id, job_id, permit))
    }

    fn spawn_attempt(&self, (pipeline_id, job_id, permit): (String, JobId, crate::runtime::gate::GatePermit)) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            scheduler.run_attempt(&pipeline_id, &job_id).await;
            scheduler.wakeup.notify_one();
        });
    }

    async fn run_attempt(&self, pipeline_id: &str, job_id: &JobId) {
        let token = CancellationToken::new();
        self.cancels.lock().insert(job_id.clone(), token.clone());

        let outcome = runner::run_job(
            &*self.store,
            &self.registry,
            &self.bus,
            &self.clock,
            pipeline_id,
            job_id,
            token,
        )
        .await;

        self.cancels.lock().remove(job_id);

        match outcome {
            Err(err) => {
                error!(job_id = %job_id, error = %err, "job attempt failed to run");
            }
            Ok(Some(delay)) => {
                let attempt = self
                    .store
                    .get(job_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|job| job.attempt)
                    .unwrap_or(1);
                self.pending_retries.lock().insert(job_id.clone(), attempt);

                let scheduler = self.clone();
                let job_id = job_id.clone();
                let pipeline_id = pipeline_id.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    scheduler.requeue_after_retry(&pipeline_id, &job_id).await;
                });
            }
            Ok(None) => {}
        }
    }

    async fn requeue_after_retry(&self, pipeline_id: &str, job_id: &JobId) {
        self.pending_retries.lock().remove(job_id);
        match self.store.transition(job_id, Box::new(|j| j.requeue_for_retry())).await {
            Ok(_) => {
                self.queues.lock().push(pipeline_id, job_id.clone());
                self.wakeup.notify_one();
            }
            Err(err) => warn!(job_id = %job_id, error = %err, "failed to requeue job for retry"),
        }
    }
}

pub(crate) fn classify_retryable(error: &AlephError) -> bool {
    matches!(error.classification(), aleph_core::ErrorClassification::Retryable)
}

pub(crate) fn to_job_error(error: &AlephError) -> JobError {
    JobError {
        kind: error.kind().to_string(),
        message: error.to_string(),
        stack: None,
        classification: error.classification(),
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
