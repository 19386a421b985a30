//! The `Engine` root struct: owns the `CatalogStore`, `Indexer`,
//! `JobCoordinator`, `WorkerPool`, and `EventBus`, constructed once at
//! process start (`SPEC_FULL.md` §6). Replaces the teacher's ambient
//! globals (`core-new`'s `Library`/`NodeContext` statics) with one
//! explicitly-owned struct, per the Design Note in `spec.md` §9.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::indexer::Indexer;
use crate::infrastructure::database::catalog::{CatalogStore, DirectoryCacheStats, DirectorySizeStats};
use crate::infrastructure::database::entities::{entry, index_session, job};
use crate::infrastructure::database::Database;
use crate::infrastructure::events::EventBus;
use crate::infrastructure::jobs::rollup;
use crate::infrastructure::jobs::{JobCoordinator, PoolConfig, ProfileRef, WorkerPool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub struct Engine {
    config: EngineConfig,
    catalog: Arc<CatalogStore>,
    indexer: Arc<Indexer>,
    jobs: JobCoordinator,
    pool: Arc<WorkerPool>,
    events: Arc<EventBus>,
}

impl Engine {
    pub async fn connect(config: EngineConfig, database_url: &str) -> EngineResult<Self> {
        let db = Database::connect(database_url)
            .await
            .map_err(crate::infrastructure::database::catalog::CatalogError::from)?;
        db.migrate()
            .await
            .map_err(crate::infrastructure::database::catalog::CatalogError::from)?;

        let catalog = Arc::new(CatalogStore::new(db.conn().clone()));
        let events = Arc::new(EventBus::default());
        let indexer = Indexer::new(catalog.clone(), events.clone(), config.index_batch_size);
        let pool = WorkerPool::new(catalog.clone(), events.clone());
        pool.reconfigure(PoolConfig {
            worker_count: config.worker_count_default,
            max_concurrent_files: config.max_concurrent_files_default,
            poll_interval_ms: config.poll_interval_default_ms,
        });
        let jobs = JobCoordinator::new(catalog.clone(), pool.clone(), events.clone());

        Ok(Self {
            config,
            catalog,
            indexer,
            jobs,
            pool,
            events,
        })
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    fn check_allowed(&self, path: &Path) -> EngineResult<()> {
        self.config.check_allowed(path)
    }

    /// `StartIndex(root)` (`spec.md` §6).
    pub async fn start_index(&self, root: PathBuf) -> EngineResult<Uuid> {
        self.check_allowed(&root)?;
        Ok(self.indexer.start(root).await?)
    }

    /// `StopIndex()` (`spec.md` §6).
    pub async fn stop_index(&self) -> EngineResult<()> {
        Ok(self.indexer.stop().await?)
    }

    /// `IndexStatus()` (`spec.md` §6).
    pub async fn index_status(&self) -> EngineResult<Option<index_session::Model>> {
        Ok(self.indexer.status().await?)
    }

    /// `CreateCacheJob(files, dirs, profile?)` (`spec.md` §6).
    pub async fn create_cache_job(
        &self,
        files: Vec<String>,
        dirs: Vec<String>,
        profile_ref: ProfileRef,
    ) -> EngineResult<job::Model> {
        for path in files.iter().chain(dirs.iter()) {
            self.check_allowed(Path::new(path))?;
        }
        Ok(self.jobs.create_job(files, dirs, profile_ref).await?)
    }

    /// `PauseJob(id)` (`spec.md` §6).
    pub async fn pause_job(&self, id: Uuid) -> EngineResult<job::Model> {
        Ok(self.jobs.pause_job(id).await?)
    }

    /// `CancelJob(id)` (`spec.md` §6).
    pub async fn cancel_job(&self, id: Uuid) -> EngineResult<job::Model> {
        Ok(self.jobs.cancel_job(id).await?)
    }

    /// `ListJobs(limit)` (`spec.md` §6).
    pub async fn list_jobs(&self, limit: u64) -> EngineResult<Vec<job::Model>> {
        Ok(self.jobs.list_jobs(limit).await?)
    }

    pub async fn get_job(&self, id: Uuid) -> EngineResult<job::Model> {
        self.jobs.get_job(id).await?.ok_or(EngineError::JobNotFound(id))
    }

    pub async fn clear_completed_jobs(&self) -> EngineResult<u64> {
        Ok(self.jobs.clear_completed().await?)
    }

    /// `ValidateDirectoryCache(path)` (`spec.md` §4.F.2, §6) — one of the two
    /// roll-up trigger points (the other being the on-read hook in
    /// `list_directory`). Returns the validation stats plus whether the
    /// `cached` row was actually updated.
    pub async fn validate_directory_cache(&self, path: &str) -> EngineResult<(DirectoryCacheStats, bool)> {
        self.check_allowed(Path::new(path))?;
        Ok(rollup::update_if_valid(&self.catalog, path, self.config.rollup_max_depth).await?)
    }

    /// `DirectorySize(path)` (`spec.md` §4.A, §6).
    pub async fn directory_size(&self, path: &str) -> EngineResult<DirectorySizeStats> {
        self.check_allowed(Path::new(path))?;
        Ok(self
            .catalog
            .directory_size(path, self.config.directory_size_cache_ttl_ms)
            .await?)
    }

    /// Direct children, with the on-read opportunistic roll-up validate
    /// hook (`spec.md` §4.F.1).
    pub async fn list_directory(&self, path: &str) -> EngineResult<Vec<entry::Model>> {
        self.check_allowed(Path::new(path))?;
        let children = self.catalog.find_children(path).await?;

        let catalog = self.catalog.clone();
        let max_depth = self.config.rollup_max_depth;
        for child in &children {
            if child.is_directory && child.cached {
                let catalog = catalog.clone();
                let dir_path = child.path.clone();
                tokio::spawn(async move {
                    let _ = rollup::update_if_valid(&catalog, &dir_path, max_depth).await;
                });
            }
        }

        Ok(children)
    }

    /// Graceful shutdown (`spec.md` §5): stop accepting claims, wait up to
    /// `shutdown_timeout_ms` for in-flight items, then return leaving any
    /// still-running items as `running` for operator recovery.
    pub async fn shutdown(&self) {
        info!("engine shutting down");
        self.pool.shutdown();
        self.pool
            .wait_idle(Duration::from_millis(self.config.shutdown_timeout_ms))
            .await;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
