// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /api/status` — the Status Aggregator's full system snapshot.

use aleph_core::{effective_max_attempts, Clock};
use aleph_engine::aggregate;
use axum::extract::State;
use axum::Json;

use super::{ApiError, AppState};

pub async fn system_status(State(state): State<AppState>) -> Result<Json<aleph_wire::SystemStatus>, ApiError> {
    let pending = state.scheduler.pending_retry_attempts();
    let status = aggregate(
        &state.registry,
        state.store.as_ref(),
        &pending,
        effective_max_attempts(None),
        state.broadcaster.subscriber_count(),
        state.clock.epoch_ms(),
    )
    .await?;
    Ok(Json(status))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
