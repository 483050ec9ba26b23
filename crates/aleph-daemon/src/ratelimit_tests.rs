// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn localhost() -> IpAddr {
    "127.0.0.1".parse().expect("valid ip")
}

#[test]
fn burst_capacity_is_consumed_then_exhausted() {
    let limiter = RateLimiter::new(2, 0.0);
    let ip = localhost();
    assert!(limiter.try_acquire(ip));
    assert!(limiter.try_acquire(ip));
    assert!(!limiter.try_acquire(ip));
}

#[test]
fn distinct_sources_have_independent_buckets() {
    let limiter = RateLimiter::new(1, 0.0);
    let a: IpAddr = "10.0.0.1".parse().expect("valid ip");
    let b: IpAddr = "10.0.0.2".parse().expect("valid ip");
    assert!(limiter.try_acquire(a));
    assert!(!limiter.try_acquire(a));
    assert!(limiter.try_acquire(b));
}
