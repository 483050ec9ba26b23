// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generate_embeds_pipeline_and_epoch() {
    let id = JobId::generate("nightly-scan", 1_700_000_000_000);
    assert!(id.as_str().starts_with("nightly-scan-1700000000000-"));
}

#[test]
fn generate_is_unique_across_calls() {
    let a = JobId::generate("p", 1);
    let b = JobId::generate("p", 1);
    assert_ne!(a, b);
}

#[test]
fn pipeline_id_roundtrips() {
    let id = JobId::generate("security-scan", 42);
    assert_eq!(id.pipeline_id(), "security-scan");
}

#[test]
fn pipeline_id_with_hyphenated_name() {
    let id = JobId::generate("multi-repo-scan", 1_000);
    assert_eq!(id.pipeline_id(), "multi-repo-scan");
}

#[test]
fn from_string_preserves_value() {
    let id = JobId::from_string("custom-id-123");
    assert_eq!(id.as_str(), "custom-id-123");
}

#[test]
fn serde_roundtrip() {
    let id = JobId::generate("p", 7);
    let json = serde_json::to_string(&id).expect("serialize");
    let back: JobId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(id, back);
}

#[test]
fn short_truncates() {
    assert_eq!(short("abcdefghijklmnop", 8), "abcdefgh");
    assert_eq!(short("abc", 8), "abc");
}
