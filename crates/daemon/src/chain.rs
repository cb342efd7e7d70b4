// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chain advancement: compute and enqueue the next job after a completion.
//!
//! The runner never mutates existing jobs; it only creates new ones (and
//! settles the owning task's status). Every created job inherits the
//! chain's trace root and increments depth.

use sheratan_core::{
    parse_sections, Job, JobConfig, JobId, JobKind, LoopState, ResponseFormat, ResultAction,
    TaskDescriptor, TaskStatus,
};
use sheratan_store::{Store, StoreError};
use tracing::{info, warn};

/// Upper bound on follow-up nesting, so a planner that keeps asking for
/// tools cannot grow a chain forever.
pub const MAX_CHAIN_DEPTH: u32 = 16;

/// What a completion did to its chain.
#[derive(Debug, Default)]
pub struct ChainOutcome {
    /// Jobs created (already persisted to the store, not yet dispatched).
    pub created: Vec<Job>,
    /// True when the owning task reached its terminal status.
    pub task_completed: bool,
}

/// Advances chains on job completion.
pub struct ChainRunner<'a> {
    store: &'a Store,
    /// When set, tool results auto-insert an `agent_plan` follow-up so the
    /// planner sees the new context.
    auto_plan: bool,
}

impl<'a> ChainRunner<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store, auto_plan: true }
    }

    pub fn auto_plan(mut self, enabled: bool) -> Self {
        self.auto_plan = enabled;
        self
    }

    /// Handle a completed job's result action.
    pub fn on_job_completed(
        &self,
        job: &Job,
        action: Option<&ResultAction>,
        now_ms: u64,
    ) -> Result<ChainOutcome, StoreError> {
        let outcome = match action {
            None => self.settle(job)?,
            Some(ResultAction::CreateFollowupJobs { new_jobs }) => {
                let mut created = Vec::with_capacity(new_jobs.len());
                for spec in new_jobs {
                    let mut config = JobConfig::new(
                        JobId::generate(),
                        job.task_id.clone(),
                        job.mission_id.clone(),
                        spec.kind,
                    );
                    config.payload.task = self.task_descriptor(job, spec.kind);
                    config.payload.params = spec.params.clone();
                    if spec.depends_on_parent {
                        config.depends_on = vec![job.id.clone()];
                    }
                    config.priority = spec.priority;
                    config.trace_id = job.trace_id.clone();
                    config.depth = job.depth + 1;
                    let mut new_job = Job::new(config, now_ms);
                    // Seed the parent link so the next dispatch decision
                    // lands under this job's node in the trace tree.
                    new_job.decision_node_id = job.decision_node_id.clone();
                    self.store.put_job(&new_job)?;
                    created.push(new_job);
                }
                ChainOutcome { created, task_completed: false }
            }
            Some(ResultAction::SelfloopResult { markdown }) => {
                self.advance_selfloop(job, markdown, now_ms)?
            }
            Some(tool) if tool.is_tool_result() => self.maybe_auto_plan(job, tool, now_ms)?,
            Some(_) => self.settle(job)?,
        };
        Ok(outcome)
    }

    /// Parse the worker's Markdown, fold it into the loop state, and either
    /// enqueue the next iteration or complete the task.
    fn advance_selfloop(
        &self,
        job: &Job,
        markdown: &str,
        now_ms: u64,
    ) -> Result<ChainOutcome, StoreError> {
        let state = match job.payload.params.get("loop") {
            Some(raw) => match serde_json::from_value::<LoopState>(raw.clone()) {
                Ok(state) => state,
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "unreadable loop state, completing task");
                    return self.settle(job);
                }
            },
            None => {
                warn!(job_id = %job.id, "selfloop job without loop state, completing task");
                return self.settle(job);
            }
        };

        let sections = parse_sections(markdown);
        match state.advance(&sections) {
            Some(next) => {
                let iteration = next.iteration;
                let mut config = JobConfig::new(
                    JobId::generate(),
                    job.task_id.clone(),
                    job.mission_id.clone(),
                    JobKind::Selfloop,
                );
                config.payload.task = self.task_descriptor(job, JobKind::Selfloop);
                config.payload.params = serde_json::json!({
                    "goal": next.goal.clone(),
                    "loop": next,
                });
                config.payload.response_format = Some(ResponseFormat::SelfloopMarkdown);
                config.trace_id = job.trace_id.clone();
                config.depth = job.depth + 1;
                let mut next_job = Job::new(config, now_ms);
                next_job.decision_node_id = job.decision_node_id.clone();
                self.store.put_job(&next_job)?;
                info!(job_id = %next_job.id, iteration, "selfloop advanced");
                Ok(ChainOutcome { created: vec![next_job], task_completed: false })
            }
            None => self.settle(job),
        }
    }

    /// After a tool result, optionally hand the new context back to the
    /// planner with an auto-inserted `agent_plan` job.
    fn maybe_auto_plan(
        &self,
        job: &Job,
        tool: &ResultAction,
        now_ms: u64,
    ) -> Result<ChainOutcome, StoreError> {
        let plan_wanted =
            self.auto_plan && job.kind != JobKind::AgentPlan && job.depth < MAX_CHAIN_DEPTH;
        if !plan_wanted {
            return self.settle(job);
        }

        let mut config = JobConfig::new(
            JobId::generate(),
            job.task_id.clone(),
            job.mission_id.clone(),
            JobKind::AgentPlan,
        );
        config.payload.task = self.task_descriptor(job, JobKind::AgentPlan);
        config.payload.params = serde_json::json!({
            "context": tool,
            "source_job": job.id.clone(),
        });
        config.depends_on = vec![job.id.clone()];
        config.trace_id = job.trace_id.clone();
        config.depth = job.depth + 1;
        let mut plan_job = Job::new(config, now_ms);
        plan_job.decision_node_id = job.decision_node_id.clone();
        self.store.put_job(&plan_job)?;
        Ok(ChainOutcome { created: vec![plan_job], task_completed: false })
    }

    fn settle(&self, job: &Job) -> Result<ChainOutcome, StoreError> {
        self.store.update_task_status(&job.task_id, TaskStatus::Completed)?;
        Ok(ChainOutcome { created: Vec::new(), task_completed: true })
    }

    fn task_descriptor(&self, job: &Job, kind: JobKind) -> TaskDescriptor {
        TaskDescriptor {
            id: job.task_id.clone(),
            name: job.payload.task.name.clone(),
            kind,
        }
    }
}

/// Build the first job of a self-loop task.
pub fn initial_selfloop_job(
    task_id: sheratan_core::TaskId,
    mission_id: sheratan_core::MissionId,
    task_name: &str,
    goal: &str,
    max_iterations: u32,
    now_ms: u64,
) -> Job {
    let state = LoopState::new(goal, max_iterations);
    let mut config = JobConfig::new(JobId::generate(), task_id.clone(), mission_id, JobKind::Selfloop);
    config.payload.task = TaskDescriptor {
        id: task_id,
        name: task_name.to_string(),
        kind: JobKind::Selfloop,
    };
    config.payload.params = serde_json::json!({
        "goal": goal,
        "loop": state,
    });
    config.payload.response_format = Some(ResponseFormat::SelfloopMarkdown);
    Job::new(config, now_ms)
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
