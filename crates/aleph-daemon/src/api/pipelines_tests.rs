// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use aleph_core::{PipelineDescriptor, SystemClock};
use aleph_storage::SqliteJobStore;
use axum::extract::{Path, Query, State};

use super::*;
use crate::broadcast::Broadcaster;
use crate::health::SecretCacheProbe;
use crate::ratelimit::RateLimiter;
use aleph_adapters::{FunctionWorker, WorkerOutcome};
use aleph_engine::{EventBus, Gate, PipelineRegistry, Scheduler};

async fn state_with_registered_pipeline() -> AppState {
    let store = Arc::new(SqliteJobStore::in_memory().await.expect("open store"));
    let mut registry = PipelineRegistry::new();
    registry.register(
        PipelineDescriptor::new("nightly-scan"),
        Arc::new(|| {
            Arc::new(FunctionWorker::new(|_job_id, data, _progress| async move { WorkerOutcome::Completed(data) }))
                as Arc<dyn aleph_adapters::Worker>
        }),
    );
    let registry = Arc::new(registry);
    let (bus, _sinks) = EventBus::new(16);
    let gate = Arc::new(Gate::new(4, 4));
    let scheduler = Arc::new(Scheduler::new(store.clone(), registry.clone(), bus, gate, SystemClock));

    AppState {
        store,
        registry,
        scheduler,
        broadcaster: Broadcaster::new(),
        rate_limiter: Arc::new(RateLimiter::new(20, 5.0)),
        clock: SystemClock,
        reports_dir: std::env::temp_dir(),
        default_scan_pipeline: "repomix".into(),
        secret_cache: Arc::new(SecretCacheProbe::new(None)),
    }
}

#[tokio::test]
async fn trigger_rejects_an_unregistered_pipeline() {
    let state = state_with_registered_pipeline().await;
    let err = trigger(
        State(state),
        Path("unknown-pipeline".to_string()),
        None,
        Json(TriggerRequest { data: serde_json::Value::Null }),
    )
    .await
    .expect_err("unregistered pipeline");
    assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trigger_enqueues_a_job_for_a_registered_pipeline() {
    let state = state_with_registered_pipeline().await;
    let (status, Json(response)) = trigger(
        State(state),
        Path("nightly-scan".to_string()),
        None,
        Json(TriggerRequest { data: serde_json::json!({"target": "main"}) }),
    )
    .await
    .expect("trigger");
    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert_eq!(response.pipeline_id, "nightly-scan");
    assert_eq!(response.status, "queued");
}

#[tokio::test]
async fn trigger_is_rejected_with_429_once_the_source_bucket_is_empty() {
    let state = state_with_registered_pipeline().await;
    let source = std::net::IpAddr::from([127, 0, 0, 1]);
    while state.rate_limiter.try_acquire(source) {}
    let addr = Some(axum::extract::ConnectInfo(std::net::SocketAddr::from((source, 0))));

    let err = trigger(
        State(state),
        Path("nightly-scan".to_string()),
        addr,
        Json(TriggerRequest { data: serde_json::Value::Null }),
    )
    .await
    .expect_err("rate limited");
    assert_eq!(err.status, axum::http::StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn list_jobs_paginates_and_filters_by_status() {
    let state = state_with_registered_pipeline().await;
    for _ in 0..3 {
        let job = aleph_core::Job::new("nightly-scan", serde_json::json!({}), &state.clock);
        state.scheduler.enqueue(job).await.expect("enqueue");
    }

    let Json(listing) = list_jobs(
        State(state.clone()),
        Path("nightly-scan".to_string()),
        Query(ListJobsQuery { status: Some(aleph_core::JobStatus::Queued), limit: Some(2), offset: None, tab: None }),
    )
    .await
    .expect("list");

    assert_eq!(listing.jobs.len(), 2);
    assert_eq!(listing.total, 3);
    assert!(listing.has_more);
}
