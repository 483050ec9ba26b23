// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-source token bucket rate limiting for mutation endpoints (§4.8).

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use parking_lot::Mutex;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket per source IP. `burst` is the bucket capacity (and its
/// starting fill), `refill_per_sec` the steady-state replenishment rate.
pub struct RateLimiter {
    burst: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl RateLimiter {
    pub fn new(burst: u32, refill_per_sec: f64) -> Self {
        Self { burst: burst as f64, refill_per_sec, buckets: Mutex::new(HashMap::new()) }
    }

    /// Attempts to consume one token for `source`. Returns `false` when the
    /// bucket is empty and the caller should respond `429`.
    pub fn try_acquire(&self, source: IpAddr) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(source).or_insert_with(|| Bucket { tokens: self.burst, last_refill: now });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "ratelimit_tests.rs"]
mod tests;
