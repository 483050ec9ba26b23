// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aleph_adapters::{FunctionWorker, WorkerOutcome};
use aleph_core::AlephError;
use serde_json::json;

fn echo_factory() -> WorkerFactory {
    Arc::new(|| {
        Arc::new(FunctionWorker::new(|_job_id, data, _progress| async move {
            WorkerOutcome::Completed(data)
        })) as Arc<dyn Worker>
    })
}

#[test]
fn resolve_unknown_pipeline_errors() {
    let registry = PipelineRegistry::new();
    assert!(matches!(registry.resolve("ghost"), Err(AlephError::UnknownPipeline(_))));
}

#[test]
fn registered_pipeline_resolves_and_produces_worker() {
    let mut registry = PipelineRegistry::new();
    registry.register(PipelineDescriptor::new("scan"), echo_factory());

    assert_eq!(registry.resolve("scan").expect("resolve").id, "scan");
    assert!(registry.worker_for("scan").is_ok());
    assert!(registry.contains("scan"));
    assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["scan"]);
}

#[test]
fn human_name_falls_back_to_id_when_unregistered() {
    let registry = PipelineRegistry::new();
    assert_eq!(registry.human_name("ghost"), "ghost");
}

#[test]
fn human_name_uses_descriptor_display_name_when_registered() {
    let mut registry = PipelineRegistry::new();
    let mut descriptor = PipelineDescriptor::new("scan");
    descriptor.human_name = Some("Security Scan".into());
    registry.register(descriptor, echo_factory());
    assert_eq!(registry.human_name("scan"), "Security Scan");
}

#[test]
fn json_payload_roundtrips_through_factory_worker() {
    let mut registry = PipelineRegistry::new();
    registry.register(PipelineDescriptor::new("scan"), echo_factory());
    assert!(registry.worker_for("scan").is_ok());
    let _ = json!({"probe": true});
}
