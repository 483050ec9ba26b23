// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives a single job attempt: resolves its worker, forwards progress at the
//! contractual rate limit, and applies the retry/circuit-breaker decision on
//! failure.

use std::time::Duration;

use aleph_core::{effective_max_attempts, AlephError, Clock, Event, JobId, HARD_CAP_MAX_ATTEMPTS};
use aleph_storage::JobStore;
use rand::thread_rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bus::EventBus;
use crate::registry::PipelineRegistry;
use crate::scheduler::{classify_retryable, to_job_error};

/// Progress events forwarded to the bus are rate-limited to this interval,
/// mirroring the subprocess worker's own limit so in-process workers get the
/// same guarantee without having to implement it themselves.
const PROGRESS_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Runs one attempt of `job_id`. On success, non-retryable failure, or
/// circuit break the job reaches a terminal state in the store and
/// `Ok(None)` is returned. On a retryable failure under the attempt cap,
/// `Ok(Some(delay))` is returned so the caller can requeue the job after
/// `delay`.
pub async fn run_job<C: Clock>(
    store: &dyn JobStore,
    registry: &PipelineRegistry,
    bus: &EventBus,
    clock: &C,
    pipeline_id: &str,
    job_id: &JobId,
    cancel: CancellationToken,
) -> Result<Option<Duration>, AlephError> {
    let started_at = clock.epoch_ms();
    let started = store.transition(job_id, Box::new(move |j| j.start(started_at))).await?;
    bus.publish(Event::JobStarted {
        job_id: started.id.clone(),
        pipeline_id: pipeline_id.to_string(),
        attempt: started.attempt,
    })
    .await;

    let worker = match registry.worker_for(pipeline_id) {
        Ok(worker) => worker,
        Err(err) => {
            fail_without_retry(store, bus, job_id, pipeline_id, clock, err).await?;
            return Ok(None);
        }
    };
    let max_attempts = registry
        .resolve(pipeline_id)
        .ok()
        .and_then(|descriptor| descriptor.retry_policy_override.as_ref())
        .and_then(|policy| policy.max_attempts)
        .map(effective_max_attempts)
        .unwrap_or_else(|| effective_max_attempts(None));

    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let forward_job_id = job_id.clone();
    let forward_bus = bus.clone_sender();
    let forward_pipeline = pipeline_id.to_string();
    let forwarder = tokio::spawn(async move {
        let mut last_sent: Option<Instant> = None;
        while let Some(progress) = progress_rx.recv().await {
            let now = Instant::now();
            if last_sent.is_some_and(|t| now.duration_since(t) < PROGRESS_RATE_LIMIT) {
                continue;
            }
            last_sent = Some(now);
            forward_bus
                .publish(Event::JobProgress {
                    job_id: forward_job_id.clone(),
                    pipeline_id: forward_pipeline.clone(),
                    message: progress.message,
                })
                .await;
        }
    });

    let outcome = worker.run(job_id, &started.data, progress_tx, cancel).await;
    forwarder.abort();

    match outcome {
        aleph_adapters::WorkerOutcome::Completed(result) => {
            let now = clock.epoch_ms();
            let completed = store.transition(job_id, Box::new(move |j| j.complete(result, now))).await?;
            bus.publish(Event::JobCompleted { job_id: completed.id, pipeline_id: pipeline_id.to_string() })
                .await;
            Ok(None)
        }
        aleph_adapters::WorkerOutcome::Failed(err) => {
            decide_retry_or_fail(store, bus, job_id, pipeline_id, clock, started.attempt, max_attempts, err)
                .await
        }
    }
}

/// Applies the retry policy (§4.3) to a failed attempt: circuit-break at the
/// hard cap, warn near the limit, schedule a backed-off retry for retryable
/// errors under the pipeline's effective max attempts, else fail terminally.
async fn decide_retry_or_fail<C: Clock>(
    store: &dyn JobStore,
    bus: &EventBus,
    job_id: &JobId,
    pipeline_id: &str,
    clock: &C,
    attempt: u32,
    max_attempts: u32,
    error: AlephError,
) -> Result<Option<Duration>, AlephError> {
    if attempt >= HARD_CAP_MAX_ATTEMPTS {
        fail_circuit_break(store, bus, job_id, pipeline_id, clock, attempt).await?;
        return Ok(None);
    }

    if attempt == 2 || attempt == 3 {
        bus.publish(Event::JobProgress {
            job_id: job_id.clone(),
            pipeline_id: pipeline_id.to_string(),
            message: format!("warning: attempt {attempt} failed, nearing retry limit"),
        })
        .await;
    }

    let retryable = classify_retryable(&error);
    if retryable && attempt < max_attempts {
        let delay = aleph_core::apply_jitter(aleph_core::backoff_delay(attempt), &mut thread_rng());
        bus.publish(Event::RetryScheduled {
            job_id: job_id.clone(),
            pipeline_id: pipeline_id.to_string(),
            attempt,
            delay_ms: delay.as_millis() as u64,
        })
        .await;
        return Ok(Some(delay));
    }

    let job_error = to_job_error(&error);
    let event_error = job_error.clone();
    let now = clock.epoch_ms();
    let failed = store.transition(job_id, Box::new(move |j| j.fail(job_error, now))).await?;
    bus.publish(Event::JobFailed {
        job_id: failed.id.clone(),
        pipeline_id: pipeline_id.to_string(),
        error: event_error,
    })
    .await;

    if retryable {
        // Retryable, but the pipeline's attempt budget is spent.
        bus.publish(Event::RetryExhausted { job_id: failed.id, pipeline_id: pipeline_id.to_string(), attempt })
            .await;
    } else {
        info!(job_id = %job_id, "job failed with a non-retryable error");
    }
    Ok(None)
}

async fn fail_circuit_break<C: Clock>(
    store: &dyn JobStore,
    bus: &EventBus,
    job_id: &JobId,
    pipeline_id: &str,
    clock: &C,
    attempt: u32,
) -> Result<(), AlephError> {
    let job_error = aleph_core::JobError {
        kind: "circuit_break".to_string(),
        message: format!("circuit breaker tripped after {attempt} attempts"),
        stack: None,
        classification: aleph_core::ErrorClassification::Terminal,
    };
    let event_error = job_error.clone();
    let now = clock.epoch_ms();
    let failed = store.transition(job_id, Box::new(move |j| j.fail(job_error, now))).await?;
    bus.publish(Event::JobFailed {
        job_id: failed.id.clone(),
        pipeline_id: pipeline_id.to_string(),
        error: event_error,
    })
    .await;
    bus.publish(Event::RetryExhausted { job_id: failed.id, pipeline_id: pipeline_id.to_string(), attempt })
        .await;
    Ok(())
}

/// Fails a job outright with no retry consideration (e.g. its pipeline was
/// deregistered between enqueue and admission).
async fn fail_without_retry<C: Clock>(
    store: &dyn JobStore,
    bus: &EventBus,
    job_id: &JobId,
    pipeline_id: &str,
    clock: &C,
    error: AlephError,
) -> Result<(), AlephError> {
    let job_error = to_job_error(&error);
    let event_error = job_error.clone();
    let now = clock.epoch_ms();
    let failed = store.transition(job_id, Box::new(move |j| j.fail(job_error, now))).await?;
    bus.publish(Event::JobFailed {
        job_id: failed.id,
        pipeline_id: pipeline_id.to_string(),
        error: event_error,
    })
    .await;
    Ok(())
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
