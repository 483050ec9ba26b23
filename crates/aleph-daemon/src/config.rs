// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration: built-in defaults, overridden by an optional TOML
//! file (`--config <path>` / `ALEPH_CONFIG`), overridden in turn by
//! environment variables.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Every field optional, since a TOML file may set none, some, or all of
/// them; env vars fill in whatever neither the file nor a default covers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct FileConfig {
    bind_port: Option<u16>,
    data_dir: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    concurrency: Option<usize>,
    pipeline_concurrency: Option<usize>,
    rate_limit_burst: Option<u32>,
    rate_limit_refill_per_sec: Option<f64>,
    redis_host: Option<String>,
    redis_port: Option<u16>,
    sentry_dsn: Option<String>,
    doppler_token: Option<String>,
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `JOBS_API_PORT`, default 8080.
    pub bind_port: u16,
    /// Root directory for the embedded SQLite file.
    pub data_dir: PathBuf,
    /// Directory artifacts are served from by `GET /api/reports`.
    pub reports_dir: PathBuf,
    /// Global concurrency cap `C` (§5).
    pub concurrency: usize,
    /// Per-pipeline share of `concurrency`.
    pub pipeline_concurrency: usize,
    /// Token bucket burst size for mutation endpoints.
    pub rate_limit_burst: u32,
    /// Token bucket refill rate, tokens/second.
    pub rate_limit_refill_per_sec: f64,
    /// Optional Redis cache backend; absence disables the cache transparently.
    pub redis_host: Option<String>,
    pub redis_port: Option<u16>,
    /// Optional error reporter DSN.
    pub sentry_dsn: Option<String>,
    /// Optional Doppler secret-cache token; enables the secret-cache health probe.
    pub doppler_token: Option<String>,
    /// `NODE_ENV`/`APP_ENV`, affects logging verbosity only.
    pub app_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_port: 8080,
            data_dir: PathBuf::from("./data"),
            reports_dir: PathBuf::from("./reports"),
            concurrency: aleph_engine::runtime::gate::DEFAULT_CONCURRENCY,
            pipeline_concurrency: aleph_engine::runtime::gate::DEFAULT_CONCURRENCY,
            rate_limit_burst: 20,
            rate_limit_refill_per_sec: 5.0,
            redis_host: None,
            redis_port: None,
            sentry_dsn: None,
            doppler_token: None,
            app_env: "production".to_string(),
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("alephauto.db")
    }

    /// Resolves configuration from defaults, an optional file at
    /// `config_path` (explicit `--config` flag takes priority over
    /// `ALEPH_CONFIG`), then environment variables.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let file_path = config_path.or_else(|| std::env::var("ALEPH_CONFIG").ok().map(PathBuf::from));
        if let Some(path) = file_path {
            let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
            let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse(path, e))?;
            config.apply_file(file);
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.bind_port {
            self.bind_port = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.reports_dir {
            self.reports_dir = v;
        }
        if let Some(v) = file.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = file.pipeline_concurrency {
            self.pipeline_concurrency = v;
        }
        if let Some(v) = file.rate_limit_burst {
            self.rate_limit_burst = v;
        }
        if let Some(v) = file.rate_limit_refill_per_sec {
            self.rate_limit_refill_per_sec = v;
        }
        if file.redis_host.is_some() {
            self.redis_host = file.redis_host;
        }
        if file.redis_port.is_some() {
            self.redis_port = file.redis_port;
        }
        if file.sentry_dsn.is_some() {
            self.sentry_dsn = file.sentry_dsn;
        }
        if file.doppler_token.is_some() {
            self.doppler_token = file.doppler_token;
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("JOBS_API_PORT") {
            self.bind_port = v.parse().map_err(|_| ConfigError::InvalidValue("JOBS_API_PORT", v))?;
        }
        if let Ok(v) = std::env::var("ALEPH_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ALEPH_REPORTS_DIR") {
            self.reports_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ALEPH_CONCURRENCY") {
            self.concurrency = v.parse().map_err(|_| ConfigError::InvalidValue("ALEPH_CONCURRENCY", v))?;
        }
        if let Ok(v) = std::env::var("ALEPH_PIPELINE_CONCURRENCY") {
            self.pipeline_concurrency =
                v.parse().map_err(|_| ConfigError::InvalidValue("ALEPH_PIPELINE_CONCURRENCY", v))?;
        }
        if let Ok(v) = std::env::var("ALEPH_RATE_LIMIT_BURST") {
            self.rate_limit_burst =
                v.parse().map_err(|_| ConfigError::InvalidValue("ALEPH_RATE_LIMIT_BURST", v))?;
        }
        if let Ok(v) = std::env::var("ALEPH_RATE_LIMIT_REFILL_PER_SEC") {
            self.rate_limit_refill_per_sec =
                v.parse().map_err(|_| ConfigError::InvalidValue("ALEPH_RATE_LIMIT_REFILL_PER_SEC", v))?;
        }
        if let Ok(v) = std::env::var("REDIS_HOST") {
            self.redis_host = Some(v);
        }
        if let Ok(v) = std::env::var("REDIS_PORT") {
            self.redis_port = Some(v.parse().map_err(|_| ConfigError::InvalidValue("REDIS_PORT", v))?);
        }
        if let Ok(v) = std::env::var("SENTRY_DSN") {
            self.sentry_dsn = Some(v);
        }
        if let Ok(v) = std::env::var("DOPPLER_TOKEN") {
            self.doppler_token = Some(v);
        }
        if let Ok(v) = std::env::var("APP_ENV").or_else(|_| std::env::var("NODE_ENV")) {
            self.app_env = v;
        }
        Ok(())
    }

    /// Cron schedules for auto-triggered pipelines, read from any
    /// `<PIPELINE>_CRON_SCHEDULE` environment variable. Pipeline ids are
    /// lowercased, hyphenated env-var segments (`NIGHTLY_SCAN_CRON_SCHEDULE`
    /// -> `nightly-scan`).
    pub fn cron_schedules() -> Vec<(String, String)> {
        std::env::vars()
            .filter_map(|(key, value)| {
                let pipeline = key.strip_suffix("_CRON_SCHEDULE")?;
                Some((pipeline.to_lowercase().replace('_', "-"), value))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
