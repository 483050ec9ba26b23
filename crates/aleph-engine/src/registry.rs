// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline Registry: maps `pipeline_id` to its descriptor and Worker factory.
//! Registered once at startup and immutable thereafter.

use std::collections::HashMap;
use std::sync::Arc;

use aleph_adapters::Worker;
use aleph_core::{AlephError, PipelineDescriptor};

/// Produces a fresh [`Worker`] for a given pipeline. Factories are cheap to
/// call — most wrap an `Arc` clone or construct a stateless subprocess worker.
pub type WorkerFactory = Arc<dyn Fn() -> Arc<dyn Worker> + Send + Sync>;

struct Entry {
    descriptor: PipelineDescriptor,
    factory: WorkerFactory,
}

/// The single source of truth for which pipeline ids are "live". Combined
/// with `JobStore::distinct_pipeline_ids`, the Status Aggregator derives the
/// full pipeline list (including ids with zero rows, and historical ids no
/// longer registered).
#[derive(Default)]
pub struct PipelineRegistry {
    entries: HashMap<String, Entry>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pipeline. Intended to be called only during startup.
    pub fn register(&mut self, descriptor: PipelineDescriptor, factory: WorkerFactory) {
        self.entries.insert(descriptor.id.clone(), Entry { descriptor, factory });
    }

    pub fn resolve(&self, pipeline_id: &str) -> Result<&PipelineDescriptor, AlephError> {
        self.entries
            .get(pipeline_id)
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| AlephError::UnknownPipeline(pipeline_id.to_string()))
    }

    pub fn worker_for(&self, pipeline_id: &str) -> Result<Arc<dyn Worker>, AlephError> {
        self.entries
            .get(pipeline_id)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| AlephError::UnknownPipeline(pipeline_id.to_string()))
    }

    /// Falls back to the id itself for pipelines no longer registered, so
    /// historical jobs still render a display name.
    pub fn human_name(&self, pipeline_id: &str) -> String {
        self.entries
            .get(pipeline_id)
            .map(|entry| entry.descriptor.display_name().to_string())
            .unwrap_or_else(|| pipeline_id.to_string())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, pipeline_id: &str) -> bool {
        self.entries.contains_key(pipeline_id)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
