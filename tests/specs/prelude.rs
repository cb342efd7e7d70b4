// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for the scenario specs.

pub use sheratan_core::{
    Capability, Clock, FakeClock, Intent, Job, JobConfig, JobId, JobKind, JobResult, JobStatus,
    Mission, MissionId, ResultAction, ResultMetrics, SystemState, Task, TaskId, TaskStatus,
    WorkerEndpoint, WorkerId,
};
pub use sheratan_daemon::{
    dispatch_job, dispatch_once, handle_result, reap_once, Config, CoreCtx, DispatchOutcome,
    Registration, SharedClock, SyncOutcome,
};

use std::collections::HashMap;
use std::sync::Arc;

/// An in-process mesh: core context plus controllable time.
pub struct Mesh {
    pub dir: tempfile::TempDir,
    pub ctx: Arc<CoreCtx>,
    pub clock: FakeClock,
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_root(dir.path());
        tweak(&mut config);
        let clock = FakeClock::new();
        clock.set_epoch_ms(1_000_000);
        let ctx = CoreCtx::assemble(config, SharedClock::Fake(clock.clone())).unwrap();
        ctx.state_machine
            .transition(
                SystemState::Operational,
                "startup",
                "specs",
                serde_json::Value::Null,
                clock.epoch_ms(),
            )
            .unwrap();
        Mesh { dir, ctx, clock }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub fn register_worker(&self, id: &str, kinds: &[JobKind]) {
        self.ctx.registry.register(
            Registration {
                worker_id: WorkerId::new(id),
                capabilities: kinds
                    .iter()
                    .map(|&kind| Capability { kind, cost_hint: 0.0 })
                    .collect(),
                endpoint: WorkerEndpoint::FileQueue,
                meta: HashMap::new(),
            },
            self.now_ms(),
        );
    }

    /// Create a mission, a running task, and its first pending job.
    pub fn seed_job(&self, kind: JobKind, params: serde_json::Value) -> Job {
        let mission = Mission::new(MissionId::generate(), "spec mission", self.now_ms());
        self.ctx.store.put_mission(&mission).unwrap();
        let task = Task::new(
            TaskId::generate(),
            mission.id.clone(),
            "spec task",
            kind,
            self.now_ms(),
        )
        .status(TaskStatus::Running);
        self.ctx.store.put_task(&task).unwrap();

        let mut config = JobConfig::new(JobId::generate(), task.id.clone(), mission.id, kind);
        config.payload.task = sheratan_core::TaskDescriptor {
            id: task.id,
            name: "spec task".to_string(),
            kind,
        };
        config.payload.params = params;
        let job = Job::new(config, self.now_ms());
        self.ctx.store.put_job(&job).unwrap();
        job
    }

    /// Build a pull worker rooted at the same directories. Its HTTP sync
    /// points at a dead port, so delivery happens via the outbox (and the
    /// failed-report spool, which some specs inspect deliberately).
    pub fn worker(&self, id: &str) -> sheratan_worker::Worker {
        let mut config = sheratan_worker::WorkerConfig::for_root(self.dir.path());
        config.worker_id = WorkerId::new(id);
        config.core_url = "http://127.0.0.1:9".to_string();
        sheratan_worker::Worker::new(config).unwrap()
    }

    /// Let a worker claim and execute everything currently in the inbox.
    pub async fn worker_cycle(&self, id: &str) {
        let worker = self.worker(id);
        for job_id in self.ctx.inbox.pending_ids().unwrap() {
            worker.pick_up(&job_id).await.unwrap();
        }
    }

    /// Core-side result sync over every file in the outbox.
    pub fn sync_outbox(&self) -> usize {
        let mut handled = 0;
        for path in self.ctx.outbox.list_results().unwrap() {
            sheratan_daemon::dispatcher::process_result_file(&self.ctx, &path).unwrap();
            handled += 1;
        }
        handled
    }
}
