// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline descriptors held by the Pipeline Registry.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-pipeline override of the default retry/backoff policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicyOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde::option")]
    pub base_delay: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde::option")]
    pub max_delay: Option<Duration>,
}

/// A registered pipeline. The Status Aggregator derives its pipeline list
/// from `Registry::ids() ∪ Store::distinctPipelineIds()` — this struct is
/// never the sole source of truth for "which pipelines exist".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy_override: Option<RetryPolicyOverride>,
}

impl PipelineDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), human_name: None, retry_policy_override: None }
    }

    /// Display name for this pipeline, falling back to the id when unset.
    pub fn display_name(&self) -> &str {
        self.human_name.as_deref().unwrap_or(&self.id)
    }
}

crate::builder! {
    pub struct PipelineDescriptorBuilder => PipelineDescriptor {
        into {
            id: String = "test-pipeline",
        }
        option {
            human_name: String = None,
            retry_policy_override: RetryPolicyOverride = None,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
