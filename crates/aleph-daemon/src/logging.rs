// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging setup. `RUST_LOG` wins if set; otherwise `APP_ENV`/`NODE_ENV`
//! picks a sensible default: pretty + debug for `development`, JSON + info
//! otherwise.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;

/// Installs the global `tracing` subscriber. The returned [`WorkerGuard`]
/// must be held for the lifetime of the process — dropping it stops the
/// non-blocking writer from flushing.
pub fn init(app_env: &str) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let development = app_env.eq_ignore_ascii_case("development");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if development { "debug" } else { "info" }));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer);

    if development {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    guard
}
