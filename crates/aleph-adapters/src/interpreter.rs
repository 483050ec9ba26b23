// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess interpreter discovery.
//!
//! Resolution order: an explicit override (env var or constructor argument),
//! then a local virtualenv sitting next to the pipeline's working directory,
//! then whatever `python3`/`python` is on `PATH`. The result is cached after
//! the first lookup — discovery touches the filesystem and `PATH`, and a
//! long-running daemon has no reason to repeat it per job.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use aleph_core::AlephError;

const OVERRIDE_ENV_VAR: &str = "ALEPH_PYTHON_BIN";
const VENV_DIRNAMES: [&str; 2] = [".venv", "venv"];

/// Resolves and caches the interpreter binary used to launch subprocess workers.
pub struct InterpreterResolver {
    override_path: Option<PathBuf>,
    working_dir: PathBuf,
    resolved: OnceLock<PathBuf>,
}

impl InterpreterResolver {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            override_path: std::env::var_os(OVERRIDE_ENV_VAR).map(PathBuf::from),
            working_dir: working_dir.into(),
            resolved: OnceLock::new(),
        }
    }

    /// Bypasses the environment override for testing or explicit configuration.
    pub fn with_override(working_dir: impl Into<PathBuf>, interpreter: impl Into<PathBuf>) -> Self {
        Self {
            override_path: Some(interpreter.into()),
            working_dir: working_dir.into(),
            resolved: OnceLock::new(),
        }
    }

    /// Returns the resolved interpreter path, discovering it on first call.
    pub fn resolve(&self) -> Result<&Path, AlephError> {
        if let Some(cached) = self.resolved.get() {
            return Ok(cached.as_path());
        }
        let discovered = self.discover()?;
        Ok(self.resolved.get_or_init(|| discovered).as_path())
    }

    fn discover(&self) -> Result<PathBuf, AlephError> {
        if let Some(explicit) = &self.override_path {
            return Ok(explicit.clone());
        }
        for dirname in VENV_DIRNAMES {
            let candidate = self.working_dir.join(dirname).join("bin").join("python3");
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        which::which("python3")
            .or_else(|_| which::which("python"))
            .map_err(|_| {
                AlephError::WorkerError(
                    "no python interpreter found on PATH or in a local virtualenv".into(),
                )
            })
    }
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
