// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

#[test]
fn new_job_is_queued() {
    let clock = FakeClock::new();
    let job = Job::new("nightly-scan", serde_json::json!({"target": "main"}), &clock);
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.pipeline_id, "nightly-scan");
    assert_eq!(job.attempt, 0);
    assert!(job.started_at.is_none());
    assert!(job.id.as_str().starts_with("nightly-scan-"));
}

#[test]
fn start_marks_running_and_bumps_attempt() {
    let clock = FakeClock::new();
    let mut job = Job::new("p", serde_json::json!({}), &clock);
    job.start(clock.epoch_ms());
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.attempt, 1);
    assert!(job.started_at.is_some());
}

#[test]
fn complete_clears_error_and_sets_result() {
    let clock = FakeClock::new();
    let mut job = Job::new("p", serde_json::json!({}), &clock);
    job.start(clock.epoch_ms());
    job.error = Some(JobError {
        kind: "stale".into(),
        message: "stale".into(),
        stack: None,
        classification: ErrorClassification::Retryable,
    });
    job.complete(serde_json::json!({"ok": true}), clock.epoch_ms());
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    assert!(job.completed_at.is_some());
}

#[test]
fn requeue_for_retry_resets_timestamps_and_error() {
    let clock = FakeClock::new();
    let mut job = Job::new("p", serde_json::json!({}), &clock);
    job.start(clock.epoch_ms());
    job.fail(
        JobError {
            kind: "worker_error".into(),
            message: "boom".into(),
            stack: None,
            classification: ErrorClassification::Retryable,
        },
        clock.epoch_ms(),
    );
    job.requeue_for_retry();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
    assert!(job.error.is_none());
    // attempt count is preserved across retries
    assert_eq!(job.attempt, 1);
}

#[test]
fn elapsed_ms_uses_completed_at_when_terminal() {
    let clock = FakeClock::new();
    let mut job = Job::new("p", serde_json::json!({}), &clock);
    job.start(1_000);
    job.complete(serde_json::json!({}), 1_500);
    assert_eq!(job.elapsed_ms(9_999), Some(500));
}

#[test]
fn elapsed_ms_uses_now_while_running() {
    let clock = FakeClock::new();
    let mut job = Job::new("p", serde_json::json!({}), &clock);
    job.start(1_000);
    assert_eq!(job.elapsed_ms(1_400), Some(400));
}

#[yare::parameterized(
    queued = { JobStatus::Queued, false },
    running = { JobStatus::Running, false },
    completed = { JobStatus::Completed, true },
    failed = { JobStatus::Failed, true },
    cancelled = { JobStatus::Cancelled, true },
)]
fn terminal_iff_completed_failed_or_cancelled(status: JobStatus, expected: bool) {
    assert_eq!(status.is_terminal(), expected);
}

#[test]
fn job_serde_roundtrip() {
    let clock = FakeClock::new();
    let job = Job::new("p", serde_json::json!({"a": 1}), &clock);
    let json = serde_json::to_string(&job).expect("serialize");
    let back: Job = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.id, job.id);
    assert_eq!(back.pipeline_id, job.pipeline_id);
}
