// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /health` — composes the Health Probes into one body (§4.9).

use aleph_core::Clock;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::health::{run_checks, CheckResult, CheckStatus};

use super::AppState;

#[derive(Serialize)]
pub struct HealthBody {
    pub status: CheckStatus,
    pub timestamp: u64,
    pub version: &'static str,
    pub checks: std::collections::BTreeMap<&'static str, CheckResult>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    let checks = run_checks(
        &state.store,
        &state.secret_cache,
        state.broadcaster.subscriber_count(),
        state.broadcaster.dropped_count_total(),
    )
    .await;

    let status = if checks.values().any(|c| c.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    };

    Json(HealthBody {
        status,
        timestamp: state.clock.epoch_ms(),
        version: env!("CARGO_PKG_VERSION"),
        checks,
    })
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
