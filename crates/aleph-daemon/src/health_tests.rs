// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn secret_cache_probe_disabled_without_a_token() {
    let probe = SecretCacheProbe::new(None);
    assert_eq!(probe.check().status, CheckStatus::Disabled);
}

#[test]
fn secret_cache_probe_passes_once_a_token_is_configured() {
    let probe = SecretCacheProbe::new(Some("tok"));
    probe.mark_refreshed();
    assert_eq!(probe.check().status, CheckStatus::Pass);
}

#[tokio::test]
async fn store_integrity_check_passes_on_a_fresh_store() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    let result = store_integrity_check(&store).await;
    assert_eq!(result.status, CheckStatus::Pass);
}

#[tokio::test]
async fn run_checks_reports_all_three_probes() {
    let store = SqliteJobStore::in_memory().await.expect("store");
    let secret_cache = SecretCacheProbe::new(None);
    let checks = run_checks(&store, &secret_cache, 2, 5).await;
    assert_eq!(checks.len(), 3);
    assert!(checks.contains_key("store_integrity"));
    assert!(checks.contains_key("secret_cache"));
    assert!(checks.contains_key("subscribers"));
}
