// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every layer of the control plane.

use crate::job::ErrorClassification;
use thiserror::Error;

/// Top-level error type. Every variant carries enough context to become both
/// a [`JobError`](crate::job::JobError) (via [`AlephError::classification`])
/// and an HTTP problem response at the API boundary.
#[derive(Debug, Error)]
pub enum AlephError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown pipeline: {0}")]
    UnknownPipeline(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("job {0} is not cancellable")]
    NotCancellable(String),

    #[error("rate limited")]
    RateLimited,

    #[error("retryable error: {0}")]
    Retryable(String),

    #[error("worker error: {0}")]
    WorkerError(String),

    #[error("failed to parse worker output: {0}")]
    OutputParseError(String),

    #[error("circuit break after repeated failures: {0}")]
    CircuitBreak(String),

    #[error("interrupted")]
    Interrupted,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Storage-layer failures, kept distinct from [`AlephError`] so `aleph-storage`
/// has no dependency on the rest of the error taxonomy.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("illegal transition on job {0}: already in a terminal state")]
    IllegalTransition(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AlephError {
    /// How this error should be treated by the scheduler's retry policy.
    pub fn classification(&self) -> ErrorClassification {
        match self {
            AlephError::Retryable(_) => ErrorClassification::Retryable,
            AlephError::CircuitBreak(_) => ErrorClassification::Terminal,
            AlephError::Interrupted => ErrorClassification::Terminal,
            AlephError::Validation(_)
            | AlephError::UnknownPipeline(_)
            | AlephError::DuplicateId(_)
            | AlephError::NotFound(_)
            | AlephError::NotCancellable(_)
            | AlephError::RateLimited
            | AlephError::WorkerError(_)
            | AlephError::OutputParseError(_)
            | AlephError::Storage(_) => ErrorClassification::NonRetryable,
        }
    }

    /// Short machine-readable kind, used as the `kind` field on a stored
    /// [`JobError`](crate::job::JobError) and as the API error code.
    pub fn kind(&self) -> &'static str {
        match self {
            AlephError::Validation(_) => "validation_error",
            AlephError::UnknownPipeline(_) => "unknown_pipeline",
            AlephError::DuplicateId(_) => "duplicate_id",
            AlephError::NotFound(_) => "not_found",
            AlephError::NotCancellable(_) => "not_cancellable",
            AlephError::RateLimited => "rate_limited",
            AlephError::Retryable(_) => "retryable_error",
            AlephError::WorkerError(_) => "worker_error",
            AlephError::OutputParseError(_) => "output_parse_error",
            AlephError::CircuitBreak(_) => "circuit_break",
            AlephError::Interrupted => "interrupted",
            AlephError::Storage(StorageError::IllegalTransition(_)) => "illegal_transition",
            AlephError::Storage(_) => "storage_error",
        }
    }

    /// HTTP status code for this error kind at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            AlephError::Validation(_) => 400,
            AlephError::UnknownPipeline(_) => 404,
            AlephError::NotFound(_) => 404,
            AlephError::DuplicateId(_) => 409,
            AlephError::NotCancellable(_) => 409,
            AlephError::RateLimited => 429,
            AlephError::Interrupted => 499,
            AlephError::Storage(StorageError::IllegalTransition(_)) => 409,
            AlephError::Retryable(_)
            | AlephError::WorkerError(_)
            | AlephError::OutputParseError(_)
            | AlephError::CircuitBreak(_)
            | AlephError::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
