// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon context threaded through the loops and HTTP handlers.

use crate::env::Config;
use crate::ledger::Ledger;
use crate::registry::WorkerRegistry;
use crate::state_machine::{StateMachine, StateMachineError};
use sheratan_core::{Clock, FakeClock, SystemClock};
use sheratan_journal::{BaselineTracker, DecisionJournal, JournalError, PriorsStore, WhyApi};
use sheratan_queue::{FailedReports, Inbox, Outbox, QueueError};
use sheratan_store::{Store, StoreError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Clock handle usable from both runtime loops and tests.
#[derive(Clone)]
pub enum SharedClock {
    System(SystemClock),
    Fake(FakeClock),
}

impl Clock for SharedClock {
    fn now(&self) -> Instant {
        match self {
            SharedClock::System(c) => c.now(),
            SharedClock::Fake(c) => c.now(),
        }
    }

    fn epoch_ms(&self) -> u64 {
        match self {
            SharedClock::System(c) => c.epoch_ms(),
            SharedClock::Fake(c) => c.epoch_ms(),
        }
    }
}

/// Errors surfaced when assembling or driving the core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    State(#[from] StateMachineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the dispatcher, chain runner, and HTTP layer share.
pub struct CoreCtx {
    pub config: Config,
    pub clock: SharedClock,
    pub store: Store,
    pub inbox: Inbox,
    pub outbox: Outbox,
    pub failed_reports: FailedReports,
    pub registry: WorkerRegistry,
    pub journal: DecisionJournal,
    pub priors: PriorsStore,
    pub baselines: BaselineTracker,
    pub why: WhyApi,
    pub ledger: Ledger,
    pub state_machine: StateMachine,
    pub http: reqwest::Client,
}

impl CoreCtx {
    /// Assemble the core against a configuration, performing store
    /// recovery scans and state-machine recovery on the way.
    pub fn assemble(config: Config, clock: SharedClock) -> Result<Arc<Self>, CoreError> {
        let now_ms = clock.epoch_ms();
        let store = Store::open(&config.store_dir(), &config.failed_reports)?;
        let inbox = Inbox::open(&config.queue_inbox)?;
        let outbox = Outbox::open(&config.queue_outbox)?;
        let failed_reports = FailedReports::open(&config.failed_reports)?;
        let registry = WorkerRegistry::new(config.heartbeat_timeout.as_millis() as u64);
        let journal = DecisionJournal::open(&config.logs_dir(), &config.root, config.lock_timeout)?;
        let priors = PriorsStore::load(&config.priors_path(), config.lock_timeout)?;
        let baselines = BaselineTracker::new(config.baseline_window_n);
        let why = WhyApi::new(journal.trace_path());
        let ledger = Ledger::new(&config.ledger_path(), config.lock_timeout);
        let state_machine = StateMachine::load(
            &config.snapshot_path(),
            &config.transitions_path(),
            config.lock_timeout,
            now_ms,
        )?;

        Ok(Arc::new(Self {
            config,
            clock,
            store,
            inbox,
            outbox,
            failed_reports,
            registry,
            journal,
            priors,
            baselines,
            why,
            ledger,
            state_machine,
            http: reqwest::Client::new(),
        }))
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }
}
