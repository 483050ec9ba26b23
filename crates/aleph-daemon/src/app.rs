// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application assembly: wires configuration, storage, the job control
//! plane, and the HTTP surface together into a single bound server.

use std::sync::Arc;

use aleph_adapters::{InterpreterResolver, SubprocessWorker, Worker};
use aleph_core::{PipelineDescriptor, SystemClock};
use aleph_engine::runtime::gate::Gate;
use aleph_engine::{reconcile_interrupted_jobs, EventBus, PipelineRegistry, Scheduler};
use aleph_storage::SqliteJobStore;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{router, AppState};
use crate::broadcast::{run_fanout, Broadcaster};
use crate::config::Config;
use crate::health::SecretCacheProbe;
use crate::ratelimit::RateLimiter;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Storage(#[from] aleph_core::StorageError),
    #[error(transparent)]
    Reconcile(#[from] aleph_core::AlephError),
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
}

/// Pipeline ids this daemon registers at startup, each backed by a
/// subprocess worker script under `scripts/<id>.py`. New pipelines are
/// added here; nothing else needs to change to make them show up in the
/// Status Aggregator once a job has been enqueued against them.
const REGISTERED_PIPELINES: &[&str] = &["repomix", "duplicate-detection", "git-activity"];

/// Everything [`run`] needs to serve traffic, split out so tests can build
/// the router without binding a socket.
pub struct Assembled {
    pub state: AppState,
    pub scheduler_shutdown: CancellationToken,
}

/// Builds the full application: opens storage, registers pipelines,
/// reconciles orphaned jobs, and spawns the scheduler and push fanout.
/// Does not bind a listener.
pub async fn build_app(config: &Config) -> Result<Assembled, AppError> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| AppError::Bind(config.data_dir.display().to_string(), e))?;
    std::fs::create_dir_all(&config.reports_dir)
        .map_err(|e| AppError::Bind(config.reports_dir.display().to_string(), e))?;

    let db_path = config.database_path();
    let store = Arc::new(SqliteJobStore::open(&db_path.display().to_string()).await?);

    let mut registry = PipelineRegistry::new();
    for pipeline_id in REGISTERED_PIPELINES {
        registry.register(PipelineDescriptor::new(*pipeline_id), worker_factory(pipeline_id));
    }
    let registry = Arc::new(registry);

    let (bus, sinks) = EventBus::new(aleph_engine::bus::SINK_CAPACITY);
    let clock = SystemClock;

    let reconciled = reconcile_interrupted_jobs(store.as_ref(), &bus, &clock).await?;
    if reconciled > 0 {
        warn!(reconciled, "reconciled jobs left running across a restart");
    }

    let gate = Arc::new(Gate::new(config.concurrency, config.pipeline_concurrency));
    let scheduler = Arc::new(Scheduler::new(store.clone(), registry.clone(), bus, gate, clock));

    let scheduler_shutdown = CancellationToken::new();
    tokio::spawn(scheduler.clone().run(scheduler_shutdown.clone()));

    let broadcaster = Broadcaster::new();
    tokio::spawn(run_fanout(sinks.push, broadcaster.clone()));
    tokio::spawn(audit_sink(sinks.store));
    tokio::spawn(metrics_sink(sinks.metrics));

    let state = AppState {
        store,
        registry,
        scheduler,
        broadcaster,
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_burst, config.rate_limit_refill_per_sec)),
        clock,
        reports_dir: config.reports_dir.clone(),
        default_scan_pipeline: "repomix".to_string(),
        secret_cache: Arc::new(SecretCacheProbe::new(config.doppler_token.as_deref())),
    };

    Ok(Assembled { state, scheduler_shutdown })
}

fn worker_factory(pipeline_id: &str) -> aleph_engine::WorkerFactory {
    let script = format!("scripts/{pipeline_id}.py");
    Arc::new(move || {
        let resolver = InterpreterResolver::new(".");
        Arc::new(SubprocessWorker::new(resolver, script.clone())) as Arc<dyn Worker>
    })
}

/// Structured audit log of every event crossing the bus. Job state itself is
/// already persisted synchronously by the runner before the event is
/// published; this sink exists purely for observability.
async fn audit_sink(mut events: tokio::sync::mpsc::Receiver<aleph_core::Event>) {
    while let Some(event) = events.recv().await {
        info!(event = event.name(), summary = %event.log_summary(), "event");
    }
}

/// Placeholder hook for future counter/gauge export; the Status Aggregator
/// currently derives everything on demand from the store, so this sink just
/// keeps the bus's fan-out balanced and traces at debug level.
async fn metrics_sink(mut events: tokio::sync::mpsc::Receiver<aleph_core::Event>) {
    while let Some(event) = events.recv().await {
        tracing::debug!(event = event.name(), "metrics event");
    }
}

/// Binds and serves the HTTP surface until the process is killed. Served
/// with connect-info so mutation handlers can bucket the rate limiter by
/// source IP (§4.8).
pub async fn run(config: Config) -> Result<(), AppError> {
    let assembled = build_app(&config).await?;
    let app = router(assembled.state).into_make_service_with_connect_info::<std::net::SocketAddr>();

    let addr = format!("0.0.0.0:{}", config.bind_port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| AppError::Bind(addr.clone(), e))?;
    info!(addr, "alephauto listening");

    axum::serve(listener, app).await.map_err(|e| AppError::Bind(addr, e))?;
    assembled.scheduler_shutdown.cancel();
    Ok(())
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
