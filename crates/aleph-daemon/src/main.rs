// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use aleph_daemon::{app, Config};

#[derive(Parser, Debug)]
#[command(name = "alephauto", version, about = "AlephAuto job control plane")]
struct Cli {
    /// Path to a TOML config file. Falls back to `ALEPH_CONFIG` if unset.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the job control plane and serve the HTTP/JSON API.
    Serve,
    /// Apply pending SQLite migrations against the configured database and exit.
    Migrate,
    /// Print the cron schedules configured via `<PIPELINE>_CRON_SCHEDULE` env vars.
    Cron,
    /// Probe the running daemon's `/health` endpoint and exit non-zero on failure.
    Health {
        /// Base URL of a running daemon.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(dispatch(cli.command, config))
}

async fn dispatch(command: Command, config: Config) -> ExitCode {
    match command {
        Command::Serve => {
            let _guard = aleph_daemon::logging::init(&config.app_env);
            match app::run(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("alephauto exited with an error: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Migrate => {
            let db_path = config.database_path();
            match aleph_storage::SqliteJobStore::open(&db_path.display().to_string()).await {
                Ok(_) => {
                    println!("migrations applied at {}", db_path.display());
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("migration failed: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Cron => {
            for (pipeline_id, schedule) in Config::cron_schedules() {
                println!("{pipeline_id}: {schedule}");
            }
            ExitCode::SUCCESS
        }
        Command::Health { url } => match tcp_health_check(&url).await {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(err) => {
                eprintln!("health check failed: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Best-effort liveness probe used by the `health` subcommand; a plain TCP
/// connect against the configured host:port is enough to tell an orchestrator
/// the process accepted the port, without pulling in an HTTP client dependency.
async fn tcp_health_check(url: &str) -> std::io::Result<bool> {
    let addr = url
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .split('/')
        .next()
        .unwrap_or(url);
    match tokio::net::TcpStream::connect(addr).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::ConnectionRefused => Ok(false),
        Err(err) => Err(err),
    }
}
