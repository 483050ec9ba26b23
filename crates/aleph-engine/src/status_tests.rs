// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aleph_adapters::{FunctionWorker, Worker, WorkerOutcome};
use aleph_core::{FakeClock, Job, JobError, JobStatus, PipelineDescriptorBuilder};
use aleph_storage::{JobStore, SqliteJobStore};
use serde_json::json;
use std::sync::Arc;

fn never_called_factory() -> WorkerFactory {
    Arc::new(|| {
        Arc::new(FunctionWorker::new(|_job_id, _data, _progress| async move {
            WorkerOutcome::Completed(json!({}))
        })) as Arc<dyn Worker>
    })
}

async fn seed(store: &SqliteJobStore, pipeline_id: &str, status: JobStatus, offset: u64) {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000 + offset);
    let mut job = Job::new(pipeline_id, json!({}), &clock);
    match status {
        JobStatus::Queued => {}
        JobStatus::Running => job.start(clock.epoch_ms()),
        JobStatus::Completed => {
            job.start(clock.epoch_ms());
            job.complete(json!({}), clock.epoch_ms() + 1);
        }
        JobStatus::Failed => {
            job.start(clock.epoch_ms());
            job.fail(
                JobError {
                    kind: "worker_error".into(),
                    message: "boom".into(),
                    stack: None,
                    classification: aleph_core::ErrorClassification::NonRetryable,
                },
                clock.epoch_ms() + 1,
            );
        }
        JobStatus::Cancelled => job.cancel(clock.epoch_ms()),
    }
    store.insert(&job).await.expect("insert");
}

#[tokio::test]
async fn zero_pipelines_registered_and_zero_rows_yields_empty_list() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    let registry = PipelineRegistry::new();

    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");
    assert!(status.pipelines.is_empty());
}

#[tokio::test]
async fn aggregator_counts_match_store_counts_exactly() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    for i in 0..201 {
        seed(&store, "repomix", JobStatus::Completed, i).await;
    }
    for i in 0..10 {
        seed(&store, "duplicate-detection", JobStatus::Completed, i).await;
    }
    seed(&store, "git-activity", JobStatus::Completed, 0).await;

    let registry = PipelineRegistry::new();
    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");

    assert_eq!(status.pipelines.len(), 3);
    let by_id = |id: &str| status.pipelines.iter().find(|p| p.pipeline_id == id).unwrap();
    assert_eq!(by_id("repomix").completed, 201);
    assert_eq!(by_id("duplicate-detection").completed, 10);
    assert_eq!(by_id("git-activity").completed, 1);
}

#[tokio::test]
async fn registered_pipeline_with_zero_rows_still_appears() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    let mut registry = PipelineRegistry::new();
    registry.register(
        PipelineDescriptorBuilder::default().id("empty-pipeline").human_name("Empty Pipeline").build(),
        never_called_factory(),
    );

    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");
    assert_eq!(status.pipelines.len(), 1);
    assert_eq!(status.pipelines[0].pipeline_id, "empty-pipeline");
    assert_eq!(status.pipelines[0].human_name, "Empty Pipeline");
    assert_eq!(status.pipelines[0].status, aleph_wire::PipelineHealth::Idle);
}

#[tokio::test]
async fn unregistered_pipeline_with_rows_displays_id_as_name() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    seed(&store, "ghost-pipeline", JobStatus::Completed, 0).await;
    let registry = PipelineRegistry::new();

    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");
    assert_eq!(status.pipelines[0].human_name, "ghost-pipeline");
}

#[tokio::test]
async fn pipeline_with_more_recent_failures_than_completions_and_a_failed_last_job_is_failing() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    seed(&store, "flaky", JobStatus::Completed, 0).await;
    seed(&store, "flaky", JobStatus::Failed, 1).await;
    seed(&store, "flaky", JobStatus::Failed, 2).await;
    let registry = PipelineRegistry::new();

    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");
    assert_eq!(status.pipelines[0].status, aleph_wire::PipelineHealth::Failing);
}

#[tokio::test]
async fn more_recent_failures_than_completions_but_a_completed_last_job_is_not_failing() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    seed(&store, "flaky", JobStatus::Failed, 0).await;
    seed(&store, "flaky", JobStatus::Failed, 1).await;
    seed(&store, "flaky", JobStatus::Completed, 2).await;
    let registry = PipelineRegistry::new();

    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");
    assert_eq!(status.pipelines[0].status, aleph_wire::PipelineHealth::Idle);
}

#[tokio::test]
async fn running_last_job_makes_the_pipeline_status_running_even_if_mostly_failed() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    seed(&store, "busy", JobStatus::Failed, 0).await;
    seed(&store, "busy", JobStatus::Failed, 1).await;
    seed(&store, "busy", JobStatus::Running, 2).await;
    let registry = PipelineRegistry::new();

    let status = aggregate(&registry, &store, &[], 2, 0, 1_000_000).await.expect("aggregate");
    assert_eq!(status.pipelines[0].status, aleph_wire::PipelineHealth::Running);
}

#[test]
fn retry_metrics_bucket_by_attempt_and_flag_nearing_limit() {
    let metrics = retry_metrics(&[1, 1, 2, 3, 4], 5);
    assert_eq!(metrics.attempt_1, 2);
    assert_eq!(metrics.attempt_2, 1);
    assert_eq!(metrics.attempt_3_plus, 2);
    // nearing_threshold = 5 - 1 = 4, so only the attempt=4 retry qualifies.
    assert_eq!(metrics.nearing_limit, 1);
}
