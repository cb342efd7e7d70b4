// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable mission/task/job records, one JSON document per entity.
//!
//! The store is the only mutator of entity records; every write path in
//! the core routes through it. Single-entity writes are atomic via
//! temp-then-rename; mutations of one entity class are serialized under a
//! per-class lock. Readers are lock-free and tolerate momentarily stale
//! views.

use crate::atomic::{clean_orphan_tmp, write_json_atomic};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sheratan_core::{
    Job, JobId, JobStatus, JobTransitionError, Mission, MissionId, Task, TaskId, TaskStatus,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Transition(#[from] JobTransitionError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound { entity, id: id.to_string() }
    }
}

/// File-backed entity store.
pub struct Store {
    missions_dir: PathBuf,
    tasks_dir: PathBuf,
    jobs_dir: PathBuf,
    quarantine_dir: PathBuf,
    missions: Mutex<()>,
    tasks: Mutex<()>,
    jobs: Mutex<()>,
}

impl Store {
    /// Open (or create) a store rooted at `root`. Scans for and deletes
    /// orphaned temp files from crashed writes.
    pub fn open(root: &Path, quarantine_dir: &Path) -> Result<Self, StoreError> {
        let store = Self {
            missions_dir: root.join("missions"),
            tasks_dir: root.join("tasks"),
            jobs_dir: root.join("jobs"),
            quarantine_dir: quarantine_dir.to_owned(),
            missions: Mutex::new(()),
            tasks: Mutex::new(()),
            jobs: Mutex::new(()),
        };
        for dir in [&store.missions_dir, &store.tasks_dir, &store.jobs_dir, &store.quarantine_dir] {
            fs::create_dir_all(dir)?;
        }
        for dir in [&store.missions_dir, &store.tasks_dir, &store.jobs_dir] {
            let removed = clean_orphan_tmp(dir)?;
            if removed > 0 {
                warn!(dir = %dir.display(), removed, "removed orphaned temp files");
            }
        }
        Ok(store)
    }

    // -- missions --

    pub fn put_mission(&self, mission: &Mission) -> Result<(), StoreError> {
        let _guard = self.missions.lock();
        write_json_atomic(&self.entity_path(&self.missions_dir, mission.id.as_str()), mission)?;
        Ok(())
    }

    pub fn get_mission(&self, id: &MissionId) -> Result<Mission, StoreError> {
        self.read(&self.missions_dir, id.as_str())?
            .ok_or_else(|| StoreError::not_found("mission", id))
    }

    pub fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        let mut missions: Vec<Mission> = self.list(&self.missions_dir)?;
        missions.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(missions)
    }

    /// Explicit purge: removes the mission and everything under it.
    pub fn purge_mission(&self, id: &MissionId) -> Result<(), StoreError> {
        for job in self.list_jobs_by_mission(id)? {
            let _guard = self.jobs.lock();
            remove_if_present(&self.entity_path(&self.jobs_dir, job.id.as_str()))?;
        }
        for task in self.list_tasks_by_mission(id)? {
            let _guard = self.tasks.lock();
            remove_if_present(&self.entity_path(&self.tasks_dir, task.id.as_str()))?;
        }
        let _guard = self.missions.lock();
        remove_if_present(&self.entity_path(&self.missions_dir, id.as_str()))?;
        Ok(())
    }

    // -- tasks --

    pub fn put_task(&self, task: &Task) -> Result<(), StoreError> {
        let _guard = self.tasks.lock();
        write_json_atomic(&self.entity_path(&self.tasks_dir, task.id.as_str()), task)?;
        Ok(())
    }

    pub fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.read(&self.tasks_dir, id.as_str())?
            .ok_or_else(|| StoreError::not_found("task", id))
    }

    pub fn list_tasks_by_mission(&self, mission_id: &MissionId) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.list(&self.tasks_dir)?;
        tasks.retain(|t| &t.mission_id == mission_id);
        tasks.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(tasks)
    }

    pub fn update_task_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, StoreError> {
        let _guard = self.tasks.lock();
        let mut task = self
            .read::<Task>(&self.tasks_dir, id.as_str())?
            .ok_or_else(|| StoreError::not_found("task", id))?;
        task.status = status;
        write_json_atomic(&self.entity_path(&self.tasks_dir, id.as_str()), &task)?;
        Ok(task)
    }

    // -- jobs --

    pub fn put_job(&self, job: &Job) -> Result<(), StoreError> {
        let _guard = self.jobs.lock();
        write_json_atomic(&self.entity_path(&self.jobs_dir, job.id.as_str()), job)?;
        Ok(())
    }

    pub fn get_job(&self, id: &JobId) -> Result<Job, StoreError> {
        self.read(&self.jobs_dir, id.as_str())?
            .ok_or_else(|| StoreError::not_found("job", id))
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.list(&self.jobs_dir)
    }

    pub fn list_jobs_by_task(&self, task_id: &TaskId) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.list_jobs()?;
        jobs.retain(|j| &j.task_id == task_id);
        jobs.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(jobs)
    }

    pub fn list_jobs_by_mission(&self, mission_id: &MissionId) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.list_jobs()?;
        jobs.retain(|j| &j.mission_id == mission_id);
        jobs.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms));
        Ok(jobs)
    }

    /// Jobs in `pending`, ordered by priority (higher first) then age then
    /// id for determinism. Dependency readiness is checked separately.
    pub fn list_pending_jobs_sorted(&self) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.list_jobs()?;
        jobs.retain(|j| j.status == JobStatus::Pending);
        jobs.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at_ms.cmp(&b.created_at_ms))
                .then(a.id.cmp(&b.id))
        });
        Ok(jobs)
    }

    /// True when every dependency of the job is `completed`. A missing
    /// dependency record counts as unsatisfied.
    pub fn dependencies_completed(&self, job: &Job) -> Result<bool, StoreError> {
        for dep in &job.depends_on {
            match self.read::<Job>(&self.jobs_dir, dep.as_str())? {
                Some(dep_job) if dep_job.status == JobStatus::Completed => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Transition a job's status, refusing moves outside the matrix, and
    /// apply `mutate` to the record in the same atomic write.
    pub fn update_job_status(
        &self,
        id: &JobId,
        to: JobStatus,
        mutate: impl FnOnce(&mut Job),
    ) -> Result<Job, StoreError> {
        let _guard = self.jobs.lock();
        let mut job = self
            .read::<Job>(&self.jobs_dir, id.as_str())?
            .ok_or_else(|| StoreError::not_found("job", id))?;
        job.transition(to)?;
        mutate(&mut job);
        write_json_atomic(&self.entity_path(&self.jobs_dir, id.as_str()), &job)?;
        Ok(job)
    }

    /// Mutate a job record without a status transition.
    pub fn update_job(
        &self,
        id: &JobId,
        mutate: impl FnOnce(&mut Job),
    ) -> Result<Job, StoreError> {
        let _guard = self.jobs.lock();
        let mut job = self
            .read::<Job>(&self.jobs_dir, id.as_str())?
            .ok_or_else(|| StoreError::not_found("job", id))?;
        mutate(&mut job);
        write_json_atomic(&self.entity_path(&self.jobs_dir, id.as_str()), &job)?;
        Ok(job)
    }

    // -- helpers --

    fn entity_path(&self, dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{id}.json"))
    }

    fn read<T: DeserializeOwned + Serialize>(
        &self,
        dir: &Path,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let path = self.entity_path(dir, id);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.quarantine(&path, &e);
                Ok(None)
            }
        }
    }

    fn list<T: DeserializeOwned + Serialize>(&self, dir: &Path) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(&path) {
                Ok(b) => b,
                // Raced with a concurrent purge
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_slice(&bytes) {
                Ok(value) => out.push(value),
                Err(e) => self.quarantine(&path, &e),
            }
        }
        Ok(out)
    }

    /// Move a corrupted record out of the store so scans stay clean.
    fn quarantine(&self, path: &Path, cause: &serde_json::Error) {
        error!(path = %path.display(), error = %cause, "corrupt record, quarantining");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        let dest = self.quarantine_dir.join(format!("corrupt_{file_name}"));
        if let Err(e) = fs::rename(path, &dest) {
            error!(path = %path.display(), error = %e, "failed to quarantine record");
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
