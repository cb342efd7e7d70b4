// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sheratan-daemon: the orchestration core (dispatcher, chain runner,
//! state machine, decision journal wiring, and the HTTP API)

pub mod chain;
pub mod ctx;
pub mod dispatcher;
pub mod env;
pub mod health;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod state_machine;

pub use chain::{ChainOutcome, ChainRunner};
pub use ctx::{CoreCtx, CoreError, SharedClock};
pub use dispatcher::{
    dispatch_job, dispatch_once, handle_result, intent_for, reap_once, simulate_dispatch,
    DispatchOutcome, SyncOutcome,
};
pub use env::Config;
pub use ledger::{Ledger, LedgerEntry, LedgerEvent};
pub use lifecycle::{serve_http, startup, Daemon, LifecycleError};
pub use registry::{Registration, WorkerRegistry};
pub use state_machine::{StateMachine, StateMachineError};
