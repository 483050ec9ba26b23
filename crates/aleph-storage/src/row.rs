// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `jobs` table row shape, and its conversions to/from [`aleph_core::Job`].

use aleph_core::{GitInfo, Job, JobError, JobId, JobStatus};
use aleph_core::StorageError;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub(crate) struct JobRow {
    pub id: String,
    pub pipeline_id: String,
    pub status: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub attempt: i64,
    pub data: String,
    pub result: Option<String>,
    pub error: Option<String>,
    pub git: Option<String>,
}

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> Result<JobStatus, StorageError> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        "cancelled" => Ok(JobStatus::Cancelled),
        other => Err(StorageError::Database(format!("unknown job status: {other}"))),
    }
}

impl JobRow {
    pub fn from_job(job: &Job) -> Result<Self, StorageError> {
        Ok(Self {
            id: job.id.as_str().to_string(),
            pipeline_id: job.pipeline_id.clone(),
            status: status_to_str(job.status).to_string(),
            created_at: job.created_at as i64,
            started_at: job.started_at.map(|v| v as i64),
            completed_at: job.completed_at.map(|v| v as i64),
            attempt: job.attempt as i64,
            data: serde_json::to_string(&job.data)?,
            result: job.result.as_ref().map(serde_json::to_string).transpose()?,
            error: job.error.as_ref().map(serde_json::to_string).transpose()?,
            git: job.git.as_ref().map(serde_json::to_string).transpose()?,
        })
    }

    pub fn into_job(self) -> Result<Job, StorageError> {
        let error: Option<JobError> = self.error.as_deref().map(serde_json::from_str).transpose()?;
        let git: Option<GitInfo> = self.git.as_deref().map(serde_json::from_str).transpose()?;
        Ok(Job {
            id: JobId::from_string(self.id),
            pipeline_id: self.pipeline_id,
            status: status_from_str(&self.status)?,
            created_at: self.created_at as u64,
            started_at: self.started_at.map(|v| v as u64),
            completed_at: self.completed_at.map(|v| v as u64),
            data: serde_json::from_str(&self.data)?,
            result: self.result.as_deref().map(serde_json::from_str).transpose()?,
            error,
            attempt: self.attempt as u32,
            git,
        })
    }
}
