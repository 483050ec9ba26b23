// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job domain type and its state machine.

use crate::clock::Clock;
use crate::id::JobId;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job. Transitions: `queued -> running -> {completed, failed}`,
/// and `queued|running -> cancelled` on cooperative cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Error classification, mirrored onto every stored [`JobError`] so the
/// store/aggregator never needs to re-derive it from the error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClassification {
    Retryable,
    NonRetryable,
    Terminal,
}

crate::simple_display! {
    ErrorClassification {
        Retryable => "retryable",
        NonRetryable => "non_retryable",
        Terminal => "terminal",
    }
}

/// Structured error attached to a failed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub classification: ErrorClassification,
}

/// Git context a job was triggered against, when applicable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitInfo {
    pub branch: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
}

crate::builder! {
    pub struct GitInfoBuilder => GitInfo {
        into {
            branch: String = "main",
            commit: String = "abc1234",
        }
        set {
            changed_files: Vec<String> = Vec::new(),
        }
        option {
            pr_url: String = None,
        }
    }
}

/// A single job run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub pipeline_id: String,
    pub status: JobStatus,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
}

impl Job {
    /// Create a freshly queued job.
    pub fn new(pipeline_id: impl Into<String>, data: serde_json::Value, clock: &impl Clock) -> Self {
        let pipeline_id = pipeline_id.into();
        let created_at = clock.epoch_ms();
        Self {
            id: JobId::generate(&pipeline_id, created_at),
            pipeline_id,
            status: JobStatus::Queued,
            created_at,
            started_at: None,
            completed_at: None,
            data,
            result: None,
            error: None,
            attempt: 0,
            git: None,
        }
    }

    pub fn start(&mut self, epoch_ms: u64) {
        self.status = JobStatus::Running;
        self.started_at = Some(epoch_ms);
        self.attempt += 1;
    }

    pub fn complete(&mut self, result: serde_json::Value, epoch_ms: u64) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(epoch_ms);
        self.error = None;
    }

    pub fn fail(&mut self, error: JobError, epoch_ms: u64) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(epoch_ms);
        self.error = Some(error);
    }

    pub fn cancel(&mut self, epoch_ms: u64) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(epoch_ms);
    }

    /// Reset a failed job back to queued ahead of a retry attempt.
    pub fn requeue_for_retry(&mut self) {
        self.status = JobStatus::Queued;
        self.started_at = None;
        self.completed_at = None;
        self.error = None;
    }

    pub fn elapsed_ms(&self, now_epoch_ms: u64) -> Option<u64> {
        self.started_at.map(|start| {
            let end = self.completed_at.unwrap_or(now_epoch_ms);
            end.saturating_sub(start)
        })
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            pipeline_id: String = "test-pipeline",
        }
        set {
            status: JobStatus = JobStatus::Queued,
            created_at: u64 = 1_000_000,
            data: serde_json::Value = serde_json::json!({}),
            attempt: u32 = 0,
        }
        option {
            started_at: u64 = None,
            completed_at: u64 = None,
            result: serde_json::Value = None,
            error: JobError = None,
            git: GitInfo = None,
        }
        computed {
            id: JobId = JobId::generate(&self.pipeline_id, self.created_at),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
