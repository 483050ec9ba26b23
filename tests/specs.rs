// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios for the job control plane (§8), driven against a
//! fully assembled `aleph-daemon` application the way `api/mod_tests.rs`
//! drives its router — `tower::ServiceExt::oneshot` over real HTTP
//! request/response bodies, plus direct store seeding for scenario 5's
//! aggregator-equals-store property.

use std::sync::Arc;
use std::time::Duration;

use aleph_adapters::{FunctionWorker, Worker, WorkerOutcome};
use aleph_core::{AlephError, Clock, Job, JobId, JobStatus, PipelineDescriptor, RetryPolicyOverride, SystemClock};
use aleph_daemon::{router, AppState};
use aleph_engine::{EventBus, Gate, PipelineRegistry, Scheduler};
use aleph_storage::{JobStore, SqliteJobStore};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct Harness {
    state: AppState,
    shutdown: CancellationToken,
}

impl Harness {
    async fn with_registry(mut registry: PipelineRegistry, pipeline_id: &str, worker: Arc<dyn Worker>) -> Self {
        registry.register(pipeline_descriptor(pipeline_id), Arc::new(move || worker.clone()));
        Self::start(registry).await
    }

    async fn start(registry: PipelineRegistry) -> Self {
        let store = Arc::new(SqliteJobStore::in_memory().await.expect("open in-memory store"));
        let registry = Arc::new(registry);
        let (bus, sinks) = EventBus::new(256);
        let gate = Arc::new(Gate::new(5, 5));
        let scheduler = Arc::new(Scheduler::new(store.clone(), registry.clone(), bus, gate, SystemClock));

        let shutdown = CancellationToken::new();
        tokio::spawn(scheduler.clone().run(shutdown.clone()));
        tokio::spawn(drain(sinks.store));
        tokio::spawn(drain(sinks.metrics));

        let broadcaster = aleph_daemon::broadcast::Broadcaster::new();
        tokio::spawn(aleph_daemon::broadcast::run_fanout(sinks.push, broadcaster.clone()));

        let state = AppState {
            store,
            registry,
            scheduler,
            broadcaster,
            rate_limiter: Arc::new(aleph_daemon::ratelimit::RateLimiter::new(1000, 1000.0)),
            clock: SystemClock,
            reports_dir: std::env::temp_dir(),
            default_scan_pipeline: "repomix".to_string(),
            secret_cache: Arc::new(aleph_daemon::health::SecretCacheProbe::new(None)),
        };

        Self { state, shutdown }
    }

    fn router(&self) -> axum::Router {
        router(self.state.clone())
    }

    async fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.state.store.get(job_id).await.expect("store read")
    }

    async fn wait_for_terminal(&self, job_id: &JobId) -> Job {
        let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;
        loop {
            if let Some(job) = self.get_job(job_id).await {
                if job.status.is_terminal() {
                    return job;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("job {job_id} did not reach a terminal state within {POLL_TIMEOUT:?}");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn drain(mut events: tokio::sync::mpsc::Receiver<aleph_core::Event>) {
    while events.recv().await.is_some() {}
}

fn pipeline_descriptor(id: &str) -> PipelineDescriptor {
    PipelineDescriptor::new(id)
}

fn fast_retry_descriptor(id: &str, max_attempts: u32) -> PipelineDescriptor {
    let mut descriptor = PipelineDescriptor::new(id);
    descriptor.retry_policy_override = Some(RetryPolicyOverride {
        max_attempts: Some(max_attempts),
        base_delay: Some(Duration::from_millis(10)),
        max_delay: Some(Duration::from_millis(50)),
    });
    descriptor
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, json)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, json)
}

/// Scenario 1: trigger a job, let a stub worker complete it, and confirm the
/// terminal job listing reflects the declared result.
#[tokio::test]
async fn trigger_then_complete_reports_the_workers_declared_result() {
    let worker: Arc<dyn Worker> =
        Arc::new(FunctionWorker::new(|_job_id, _data, _progress| async { WorkerOutcome::Completed(json!({"totalDuplicates": 3})) }));
    let harness = Harness::with_registry(PipelineRegistry::new(), "duplicate-detection", worker).await;

    let (status, body) = post_json(
        harness.router(),
        "/api/pipelines/duplicate-detection/trigger",
        json!({"data": {"repository_path": "/tmp/repo-A"}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "queued");
    let job_id = JobId::from_string(body["job_id"].as_str().expect("job_id string"));
    assert!(job_id.as_str().starts_with("duplicate-detection-"));

    let job = harness.wait_for_terminal(&job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result.as_ref().and_then(|r| r.get("totalDuplicates")), Some(&json!(3)));

    let (status, body) = get_json(harness.router(), "/api/pipelines/duplicate-detection/jobs?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jobs"][0]["status"], "completed");
}

/// Scenario 2: a worker fails retryably once, then succeeds — the job
/// should end up `completed` at `attempt = 2` under a single job id.
#[tokio::test]
async fn retryable_failure_then_success_completes_on_the_second_attempt() {
    let worker: Arc<dyn Worker> = Arc::new(FunctionWorker::new(|_job_id, _data, _progress| async {
        static ATTEMPTS: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);
        if ATTEMPTS.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            WorkerOutcome::Failed(AlephError::Retryable("ETIMEDOUT".to_string()))
        } else {
            WorkerOutcome::Completed(json!({"ok": true}))
        }
    }));
    let mut registry = PipelineRegistry::new();
    registry.register(fast_retry_descriptor("flaky-import", 2), Arc::new(move || worker.clone()));
    let harness = Harness::start(registry).await;

    let (status, body) =
        post_json(harness.router(), "/api/pipelines/flaky-import/trigger", json!({"data": {}})).await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = JobId::from_string(body["job_id"].as_str().expect("job_id string"));

    let job = harness.wait_for_terminal(&job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempt, 2);
}

/// Scenario 3: a worker that always fails retryably trips the circuit
/// breaker at the hard attempt cap, regardless of its own max-attempts
/// override.
#[tokio::test]
async fn always_failing_worker_trips_the_circuit_breaker_at_the_hard_cap() {
    let worker: Arc<dyn Worker> = Arc::new(FunctionWorker::new(|_job_id, _data, _progress| async {
        WorkerOutcome::Failed(AlephError::Retryable("ECONNRESET".to_string()))
    }));
    let mut registry = PipelineRegistry::new();
    registry.register(fast_retry_descriptor("always-fails", 10), Arc::new(move || worker.clone()));
    let harness = Harness::start(registry).await;

    let (status, body) = post_json(harness.router(), "/api/pipelines/always-fails/trigger", json!({"data": {}})).await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = JobId::from_string(body["job_id"].as_str().expect("job_id string"));

    let job = harness.wait_for_terminal(&job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_ref().map(|e| e.kind.as_str()), Some("circuit_break"));
    assert_eq!(job.attempt, aleph_core::HARD_CAP_MAX_ATTEMPTS);
}

/// Scenario 4: a job cancelled shortly after it starts reaches `cancelled`
/// without ever being retried.
#[tokio::test]
async fn cancelling_a_running_job_reaches_cancelled_without_a_retry() {
    let worker: Arc<dyn Worker> = Arc::new(FunctionWorker::new_cancellable(|_job_id, _data, _progress, cancel| async move {
        cancel.cancelled().await;
        WorkerOutcome::Failed(AlephError::Interrupted)
    }));
    let harness = Harness::with_registry(PipelineRegistry::new(), "long-running", worker).await;

    let (_, body) = post_json(harness.router(), "/api/pipelines/long-running/trigger", json!({"data": {}})).await;
    let job_id = JobId::from_string(body["job_id"].as_str().expect("job_id string"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let (status, _) = {
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/scans/{job_id}"))
            .body(Body::empty())
            .expect("request");
        let response = harness.router().oneshot(request).await.expect("response");
        let status = response.status();
        (status, ())
    };
    assert_eq!(status, StatusCode::OK);

    let job = harness.wait_for_terminal(&job_id).await;
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.attempt, 1);
}

/// Scenario 5: the Status Aggregator's per-pipeline completed counts match
/// rows seeded directly into the store, for both registered and
/// store-only (unregistered) pipelines.
#[tokio::test]
async fn status_endpoint_completed_counts_match_directly_seeded_store_rows() {
    let mut registry = PipelineRegistry::new();
    registry.register(pipeline_descriptor("repomix"), Arc::new(|| Arc::new(FunctionWorker::new(|_, data, _| async move { WorkerOutcome::Completed(data) })) as Arc<dyn Worker>));
    let harness = Harness::start(registry).await;

    seed_completed(&harness, "repomix", 201).await;
    seed_completed(&harness, "duplicate-detection", 10).await;
    seed_completed(&harness, "git-activity", 1).await;

    let (status, body) = get_json(harness.router(), "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let pipelines = body["pipelines"].as_array().expect("pipelines array");
    assert_eq!(pipelines.len(), 3);

    for (pipeline_id, expected) in [("repomix", 201), ("duplicate-detection", 10), ("git-activity", 1)] {
        let entry =
            pipelines.iter().find(|p| p["pipeline_id"] == pipeline_id).unwrap_or_else(|| panic!("missing {pipeline_id}"));
        assert_eq!(entry["completed"], expected);
    }
}

async fn seed_completed(harness: &Harness, pipeline_id: &str, count: usize) {
    for i in 0..count {
        let mut job = Job::new(pipeline_id, json!({"seed": i}), &SystemClock);
        job.start(harness.state.clock.epoch_ms());
        job.complete(json!({"seed": i}), harness.state.clock.epoch_ms());
        harness.state.store.insert(&job).await.expect("seed insert");
    }
}

/// Scenario 6: triggering a burst of jobs produces `job:created` before
/// `job:started` before a terminal event for every job id, observed through
/// direct store polling rather than a live websocket connection — the push
/// channel's batching contract is covered by unit tests on `SubscriberState`
/// in `broadcast_tests.rs`.
#[tokio::test]
async fn bursting_jobs_preserves_per_job_event_ordering_in_the_store() {
    let worker: Arc<dyn Worker> =
        Arc::new(FunctionWorker::new(|_job_id, data, _progress| async move { WorkerOutcome::Completed(data) }));
    let harness = Harness::with_registry(PipelineRegistry::new(), "burst-pipeline", worker).await;

    let mut job_ids = Vec::new();
    for i in 0..50 {
        let (status, body) =
            post_json(harness.router(), "/api/pipelines/burst-pipeline/trigger", json!({"data": {"i": i}})).await;
        assert_eq!(status, StatusCode::CREATED);
        job_ids.push(JobId::from_string(body["job_id"].as_str().expect("job_id string")));
    }

    for job_id in job_ids {
        let job = harness.wait_for_terminal(&job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.started_at.is_some());
        assert!(job.started_at.expect("started_at") >= job.created_at);
    }
}
