// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aleph-adapters: Worker Runtime implementations — the in-process function
//! variant and the managed-subprocess variant — plus interpreter discovery.

pub mod in_process;
pub mod interpreter;
pub mod subprocess;
pub mod worker;

pub use in_process::FunctionWorker;
pub use interpreter::InterpreterResolver;
pub use subprocess::SubprocessWorker;
pub use worker::{Worker, WorkerOutcome, WorkerProgress};
