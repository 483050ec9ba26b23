// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aleph_core::AlephError;
use serde_json::json;

#[tokio::test]
async fn function_worker_invokes_closure_and_returns_its_outcome() {
    let worker = FunctionWorker::new(|_job_id, data, _progress| async move {
        WorkerOutcome::Completed(json!({"echoed": data}))
    });
    let (tx, _rx) = mpsc::channel(4);
    let outcome = worker.run(&JobId::generate("fn", 1), &json!(7), tx, CancellationToken::new()).await;
    match outcome {
        WorkerOutcome::Completed(value) => assert_eq!(value, json!({"echoed": 7})),
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn function_worker_propagates_failure() {
    let worker = FunctionWorker::new(|_job_id, _data, _progress| async move {
        WorkerOutcome::Failed(AlephError::Retryable("transient".into()))
    });
    let (tx, _rx) = mpsc::channel(4);
    let outcome = worker.run(&JobId::generate("fn", 1), &json!(null), tx, CancellationToken::new()).await;
    assert!(matches!(outcome, WorkerOutcome::Failed(AlephError::Retryable(_))));
}

#[tokio::test]
async fn cancellable_worker_observes_token_cancellation() {
    let worker = FunctionWorker::new_cancellable(|_job_id, _data, _progress, cancel| async move {
        cancel.cancelled().await;
        WorkerOutcome::Failed(AlephError::Interrupted)
    });
    let (tx, _rx) = mpsc::channel(4);
    let token = CancellationToken::new();
    token.cancel();
    let outcome = worker.run(&JobId::generate("fn", 1), &json!(null), tx, token).await;
    assert!(matches!(outcome, WorkerOutcome::Failed(AlephError::Interrupted)));
}
