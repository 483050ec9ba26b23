// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migration applied at startup. A single embedded file keeps one
//! table with three supporting indexes.

use sqlx::sqlite::SqlitePool;

pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id           TEXT PRIMARY KEY,
    pipeline_id  TEXT NOT NULL,
    status       TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    started_at   INTEGER,
    completed_at INTEGER,
    attempt      INTEGER NOT NULL DEFAULT 0,
    data         TEXT NOT NULL,
    result       TEXT,
    error        TEXT,
    git          TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_pipeline_id ON jobs (pipeline_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status);
CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs (created_at DESC);
"#;

pub(crate) async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_V1).execute(pool).await?;
    Ok(())
}
