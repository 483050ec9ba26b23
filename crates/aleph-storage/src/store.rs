// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job Store contract and its SQLite-backed implementation.

use crate::counts::PipelineCounts;
use crate::migrations;
use crate::row::JobRow;
use aleph_core::{Job, JobId, StorageError};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

/// Storage contract for jobs: insert, atomic transition, point lookups, and
/// the aggregate queries the Status Aggregator needs.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &Job) -> Result<(), StorageError>;

    /// Apply `mutate` to the current row for `id` and persist the result
    /// inside a single transaction (read-modify-write, no lost updates).
    async fn transition(
        &self,
        id: &JobId,
        mutate: Box<dyn FnOnce(&mut Job) + Send>,
    ) -> Result<Job, StorageError>;

    async fn get(&self, id: &JobId) -> Result<Option<Job>, StorageError>;

    async fn list_by_pipeline(&self, pipeline_id: &str, limit: u32) -> Result<Vec<Job>, StorageError>;

    async fn distinct_pipeline_ids(&self) -> Result<Vec<String>, StorageError>;

    async fn counts(&self, pipeline_id: &str) -> Result<PipelineCounts, StorageError>;

    async fn last_job(&self, pipeline_id: &str) -> Result<Option<Job>, StorageError>;

    /// All jobs currently `running`, across every pipeline. Used at startup
    /// to reconcile jobs orphaned by an unclean shutdown.
    async fn list_running(&self) -> Result<Vec<Job>, StorageError>;
}

/// Single-file embedded SQLite job store.
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Open (creating if absent) the SQLite file at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&url)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        migrations::run(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }

    /// In-memory store, for tests.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        migrations::run(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StorageError> {
        let row = JobRow::from_job(job)?;
        sqlx::query(
            "INSERT INTO jobs (id, pipeline_id, status, created_at, started_at, completed_at, attempt, data, result, error, git)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.id)
        .bind(row.pipeline_id)
        .bind(row.status)
        .bind(row.created_at)
        .bind(row.started_at)
        .bind(row.completed_at)
        .bind(row.attempt)
        .bind(row.data)
        .bind(row.result)
        .bind(row.error)
        .bind(row.git)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    async fn transition(
        &self,
        id: &JobId,
        mutate: Box<dyn FnOnce(&mut Job) + Send>,
    ) -> Result<Job, StorageError> {
        let mut tx = self.pool.begin().await.map_err(|e| StorageError::Database(e.to_string()))?;

        let row: JobRow = sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(id.as_str().to_string()))?;

        let mut job = row.into_job()?;
        if job.status.is_terminal() {
            return Err(StorageError::IllegalTransition(id.as_str().to_string()));
        }
        mutate(&mut job);
        let updated = JobRow::from_job(&job)?;

        sqlx::query(
            "UPDATE jobs SET status = ?, started_at = ?, completed_at = ?, attempt = ?, result = ?, error = ?, git = ?
             WHERE id = ?",
        )
        .bind(updated.status)
        .bind(updated.started_at)
        .bind(updated.completed_at)
        .bind(updated.attempt)
        .bind(updated.result)
        .bind(updated.error)
        .bind(updated.git)
        .bind(updated.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> Result<Option<Job>, StorageError> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        row.map(JobRow::into_job).transpose()
    }

    async fn list_by_pipeline(&self, pipeline_id: &str, limit: u32) -> Result<Vec<Job>, StorageError> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT * FROM jobs WHERE pipeline_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(pipeline_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn distinct_pipeline_ids(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT DISTINCT pipeline_id FROM jobs")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("pipeline_id")).collect())
    }

    async fn counts(&self, pipeline_id: &str) -> Result<PipelineCounts, StorageError> {
        let rows = sqlx::query("SELECT status, COUNT(*) as n FROM jobs WHERE pipeline_id = ? GROUP BY status")
            .bind(pipeline_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut counts = PipelineCounts::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            let n = n as u64;
            match status.as_str() {
                "queued" => counts.queued = n,
                "running" => counts.running = n,
                "completed" => counts.completed = n,
                "failed" => counts.failed = n,
                "cancelled" => counts.cancelled = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    async fn last_job(&self, pipeline_id: &str) -> Result<Option<Job>, StorageError> {
        let row: Option<JobRow> =
            sqlx::query_as("SELECT * FROM jobs WHERE pipeline_id = ? ORDER BY created_at DESC LIMIT 1")
                .bind(pipeline_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Database(e.to_string()))?;
        row.map(JobRow::into_job).transpose()
    }

    async fn list_running(&self) -> Result<Vec<Job>, StorageError> {
        let rows: Vec<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE status = 'running'")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        rows.into_iter().map(JobRow::into_job).collect()
    }
}

impl SqliteJobStore {
    /// Cheap integrity sanity check against the backing file, for the
    /// store-integrity health probe.
    pub async fn quick_check(&self) -> Result<bool, StorageError> {
        let row = sqlx::query("PRAGMA quick_check")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let result: String = row.get(0);
        Ok(result == "ok")
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
