//! Job Coordinator (`spec.md` §4.D).
//!
//! A thin struct over `Arc<CatalogStore>` + `Arc<WorkerPool>` + `Arc<EventBus>`,
//! shaped like the teacher's `JobManager`
//! (`infrastructure/jobs/manager.rs`) but scoped to one concrete job kind.

use super::error::{JobError, JobResult};
use super::worker_pool::{PoolConfig, WorkerPool};
use crate::domain::status::JobStatus;
use crate::infrastructure::database::catalog::CatalogStore;
use crate::infrastructure::database::entities::{job, profile};
use crate::infrastructure::events::{Event, EventBus};
use crate::profile_selector::select_profile;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// How the caller wants the Job's Profile resolved (`spec.md` §4.D.2).
pub enum ProfileRef {
    Id(Uuid),
    Name(String),
    /// Resolve via the Selector on the final path set, falling back to the
    /// default profile.
    Auto,
}

pub struct JobCoordinator {
    catalog: Arc<CatalogStore>,
    pool: Arc<WorkerPool>,
    events: Arc<EventBus>,
}

impl JobCoordinator {
    pub fn new(catalog: Arc<CatalogStore>, pool: Arc<WorkerPool>, events: Arc<EventBus>) -> Self {
        Self { catalog, pool, events }
    }

    /// `CreateJob(file_paths, directory_paths, profile_ref?)` (`spec.md` §4.D).
    pub async fn create_job(
        &self,
        file_paths: Vec<String>,
        directory_paths: Vec<String>,
        profile_ref: ProfileRef,
    ) -> JobResult<job::Model> {
        let mut files = file_paths;
        if files.is_empty() && !directory_paths.is_empty() {
            let mut expanded = Vec::new();
            for dir in &directory_paths {
                let descendants = self.catalog.find_files_recursively(dir).await?;
                expanded.extend(descendants.into_iter().map(|e| e.path));
            }
            files = expanded;
        }
        if files.is_empty() {
            return Err(JobError::NoWork);
        }

        let profile = self.resolve_profile(profile_ref, &files).await?;

        let job = self
            .catalog
            .create_job(&files, &directory_paths, profile.id)
            .await?;

        info!(job_id = %job.id, profile = %profile.name, total_files = job.total_files, "job created");

        self.pool.reconfigure(PoolConfig {
            worker_count: profile.worker_count.max(1) as u32,
            max_concurrent_files: profile.max_concurrent_files.max(1) as u32,
            poll_interval_ms: profile.worker_poll_interval_ms.max(1) as u64,
        });

        self.events.emit(Event::JobCreated {
            job_id: job.id,
            total_files: job.total_files,
            profile: profile.name,
        });

        Ok(job)
    }

    async fn resolve_profile(
        &self,
        profile_ref: ProfileRef,
        files: &[String],
    ) -> JobResult<profile::Model> {
        match profile_ref {
            ProfileRef::Id(id) => self
                .catalog
                .find_profile_by_id(id)
                .await?
                .ok_or_else(|| JobError::ProfileNotFound(id.to_string())),
            ProfileRef::Name(name) => self
                .catalog
                .find_profile_by_name(&name)
                .await?
                .ok_or_else(|| JobError::ProfileNotFound(name)),
            ProfileRef::Auto => {
                let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
                let selected = select_profile(&paths).await;
                if let Some(profile) = self.catalog.find_profile_by_name(selected.as_str()).await? {
                    return Ok(profile);
                }
                self.catalog
                    .default_profile()
                    .await?
                    .ok_or_else(|| JobError::ProfileNotFound("default".to_string()))
            }
        }
    }

    /// `PauseJob(id)` — valid only from `running` (`spec.md` §4.D).
    pub async fn pause_job(&self, id: Uuid) -> JobResult<job::Model> {
        let job = self.catalog.get_job(id).await?.ok_or(JobError::NotFound(id))?;
        let status = parse_status(&job.status, id)?;
        if status != JobStatus::Running {
            return Err(JobError::InvalidTransition {
                job_id: id,
                reason: format!("cannot pause job from '{status}'"),
            });
        }
        self.catalog.set_job_status(id, JobStatus::Paused, None).await?;
        self.catalog.get_job(id).await?.ok_or(JobError::NotFound(id))
    }

    /// `CancelJob(id)` — valid from `{pending, running, paused}`
    /// (`spec.md` §4.D). Already-`running` items finish or fail normally.
    pub async fn cancel_job(&self, id: Uuid) -> JobResult<job::Model> {
        let job = self.catalog.get_job(id).await?.ok_or(JobError::NotFound(id))?;
        let status = parse_status(&job.status, id)?;
        if !matches!(status, JobStatus::Pending | JobStatus::Running | JobStatus::Paused) {
            return Err(JobError::InvalidTransition {
                job_id: id,
                reason: format!("cannot cancel job from '{status}'"),
            });
        }
        self.catalog.set_job_status(id, JobStatus::Cancelled, None).await?;
        self.catalog.get_job(id).await?.ok_or(JobError::NotFound(id))
    }

    /// `ClearCompleted()` — delete terminal Jobs and cascade-delete their
    /// JobItems (`spec.md` §4.D).
    pub async fn clear_completed(&self) -> JobResult<u64> {
        Ok(self.catalog.delete_terminal_jobs().await?)
    }

    pub async fn get_job(&self, id: Uuid) -> JobResult<Option<job::Model>> {
        Ok(self.catalog.get_job(id).await?)
    }

    pub async fn list_jobs(&self, limit: u64) -> JobResult<Vec<job::Model>> {
        Ok(self.catalog.list_jobs(limit).await?)
    }
}

fn parse_status(raw: &str, job_id: Uuid) -> JobResult<JobStatus> {
    JobStatus::from_str(raw).map_err(|reason| JobError::InvalidTransition { job_id, reason })
}
