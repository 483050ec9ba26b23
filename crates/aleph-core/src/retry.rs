// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy constants and the per-job retry bookkeeping record.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum retry attempts for a job before it is permanently failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
/// Hard cap on retry attempts regardless of pipeline overrides (§4.3).
pub const HARD_CAP_MAX_ATTEMPTS: u32 = 5;
/// Base delay for exponential backoff.
pub const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Backoff multiplier applied per attempt.
pub const BACKOFF_FACTOR: u32 = 2;
/// Upper bound on any single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Grace period given to a cancelled job before it is forcibly reaped.
pub const CANCEL_GRACE_MS: u64 = 5_000;

/// Tracks retry state for a single job across attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRecord {
    pub job_id: crate::id::JobId,
    pub attempt: u32,
    pub scheduled_at: u64,
    pub delay_ms: u64,
}

impl RetryRecord {
    pub fn new(job_id: crate::id::JobId, attempt: u32, scheduled_at: u64, delay_ms: u64) -> Self {
        Self { job_id, attempt, scheduled_at, delay_ms }
    }

    /// Epoch millisecond at which this attempt becomes eligible to run.
    pub fn fires_at(&self) -> u64 {
        self.scheduled_at + self.delay_ms
    }
}

/// Compute the exponential backoff delay for the given attempt (1-indexed),
/// before jitter, capped at [`MAX_BACKOFF`].
pub fn backoff_delay(attempt: u32) -> Duration {
    let pow = attempt.saturating_sub(1).min(16);
    let delay = BASE_BACKOFF.saturating_mul(BACKOFF_FACTOR.saturating_pow(pow));
    delay.min(MAX_BACKOFF)
}

/// Apply +/-50% jitter to a delay using the provided RNG, to avoid a
/// thundering herd of simultaneously-scheduled retries.
pub fn apply_jitter(delay: Duration, rng: &mut impl rand::Rng) -> Duration {
    let factor = 0.5 + rng.gen::<f64>();
    Duration::from_millis((delay.as_millis() as f64 * factor).round() as u64)
}

/// Effective max attempts for a pipeline, honoring its override but never
/// exceeding [`HARD_CAP_MAX_ATTEMPTS`].
pub fn effective_max_attempts(override_value: Option<u32>) -> u32 {
    override_value.unwrap_or(DEFAULT_MAX_ATTEMPTS).min(HARD_CAP_MAX_ATTEMPTS)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
