// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sheratan-worker: a pull worker for the Sheratan mesh

pub mod env;
pub mod executor;
pub mod runner;

pub use env::WorkerConfig;
pub use executor::{BridgeClient, ExecError, Executor, FileExecutor};
pub use runner::{Worker, WorkerError};
