// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier generation.
//!
//! Job IDs are human-greppable by construction: `{pipelineId}-{epochMs}-{rand}`.
//! Unlike a fixed-prefix scheme, the pipeline id segment has no bounded length,
//! so the backing storage is a [`smol_str::SmolStr`] rather than a fixed-size
//! inline buffer — most ids still stay on the stack, just not all of them.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Number of random suffix characters appended to every generated [`JobId`].
const RAND_SUFFIX_LEN: usize = 6;

/// Lowercase base36 alphabet used for the random suffix.
const RAND_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Unique identifier for a job run: `{pipelineId}-{epochMs}-{rand}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(SmolStr);

impl JobId {
    /// Generate a new id for a job belonging to `pipeline_id`, created at `epoch_ms`.
    pub fn generate(pipeline_id: &str, epoch_ms: u64) -> Self {
        let rand = nanoid::nanoid!(RAND_SUFFIX_LEN, &RAND_ALPHABET);
        Self(SmolStr::new(format!("{pipeline_id}-{epoch_ms}-{rand}")))
    }

    /// Parse an id from an existing string (deserialization, CLI args, etc).
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `pipelineId` segment, or the whole id if it doesn't match the
    /// expected `{pipelineId}-{epochMs}-{rand}` shape.
    pub fn pipeline_id(&self) -> &str {
        match self.0.rsplit_once('-') {
            Some((rest, _rand)) => match rest.rsplit_once('-') {
                Some((pipeline, epoch)) if epoch.chars().all(|c| c.is_ascii_digit()) => pipeline,
                _ => self.0.as_str(),
            },
            None => self.0.as_str(),
        }
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
