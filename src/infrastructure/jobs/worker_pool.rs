//! Worker Pool (`spec.md` §4.E).
//!
//! `WorkerPool` owns a `watch::Sender<PoolConfig>` that `Reconfigure` writes
//! to; each worker task holds a cloned `watch::Receiver` plus a per-slot
//! retire flag, checked between poll cycles — generalized from the teacher's
//! `JobManager::shutdown_tx` / per-job `status_tx` pattern
//! (`infrastructure/jobs/manager.rs`) from "one flag per job" to "one flag
//! per worker slot", because this pool reconfigures cardinality, not
//! individual job state.

use super::rollup;
use crate::domain::status::JobStatus;
use crate::infrastructure::database::catalog::{CatalogResult, CatalogStore, ItemOutcome};
use crate::infrastructure::database::entities::job_item;
use crate::infrastructure::events::{Event, EventBus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Bytes read per file to force the cached filesystem to materialize the
/// content (`spec.md` §4.E.6). Deliberately minimal.
const WARM_READ_BYTES: usize = 64 * 1024;
const READ_TIMEOUT_SECS: u64 = 10;
/// Claim lease (`spec.md` §9 Open Question 1 resolution).
const ITEM_LEASE_MS: i64 = 30_000;
/// Progress throttle (`spec.md` §4.E.7): at most every this many newly
/// settled items per job...
const PROGRESS_EVERY_ITEMS: i64 = 100;
/// ...or this long, whichever comes first.
const PROGRESS_EVERY_SECS: u64 = 2;

struct ProgressMark {
    settled_at_last_emit: i64,
    last_emit: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub worker_count: u32,
    pub max_concurrent_files: u32,
    pub poll_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            max_concurrent_files: 4,
            poll_interval_ms: 1000,
        }
    }
}

struct WorkerSlot {
    retire_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct WorkerPool {
    catalog: Arc<CatalogStore>,
    events: Arc<EventBus>,
    config_tx: watch::Sender<PoolConfig>,
    shutdown_tx: watch::Sender<bool>,
    next_worker_seq: AtomicU32,
    slots: Mutex<Vec<WorkerSlot>>,
    progress: Mutex<HashMap<Uuid, ProgressMark>>,
}

impl WorkerPool {
    pub fn new(catalog: Arc<CatalogStore>, events: Arc<EventBus>) -> Arc<Self> {
        let (config_tx, _) = watch::channel(PoolConfig::default());
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            catalog,
            events,
            config_tx,
            shutdown_tx,
            next_worker_seq: AtomicU32::new(0),
            slots: Mutex::new(Vec::new()),
            progress: Mutex::new(HashMap::new()),
        })
    }

    /// `Reconfigure(n, per_worker, poll)` (`spec.md` §4.E). Never preempts
    /// in-flight item processing: scaling down only marks surplus workers
    /// to retire after their current batch.
    pub fn reconfigure(self: &Arc<Self>, config: PoolConfig) {
        let _ = self.config_tx.send(config);
        let pool = self.clone();
        tokio::spawn(async move { pool.scale_to(config.worker_count as usize).await });
    }

    async fn scale_to(self: Arc<Self>, desired: usize) {
        let mut slots = self.slots.lock().await;
        slots.retain(|slot| !slot.handle.is_finished());

        while slots.len() < desired {
            let seq = self.next_worker_seq.fetch_add(1, Ordering::SeqCst);
            let worker_id = format!("worker-{seq}");
            let (retire_tx, retire_rx) = watch::channel(false);
            let config_rx = self.config_tx.subscribe();
            let shutdown_rx = self.shutdown_tx.subscribe();
            let pool = self.clone();
            let handle = tokio::spawn(pool.run_worker(worker_id, config_rx, shutdown_rx, retire_rx));
            slots.push(WorkerSlot { retire_tx, handle });
        }

        while slots.len() > desired {
            if let Some(slot) = slots.pop() {
                let _ = slot.retire_tx.send(true);
            }
        }
    }

    /// Signals every worker to exit after its current batch
    /// (`spec.md` §5 "Graceful shutdown of the whole engine").
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits up to `timeout` for all worker tasks to exit. Any items still
    /// `running` at the deadline are left as-is for operator recovery.
    pub async fn wait_idle(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut slots = self.slots.lock().await;
                slots.retain(|slot| !slot.handle.is_finished());
                if slots.is_empty() {
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("worker pool shutdown timed out with workers still running");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn run_worker(
        self: Arc<Self>,
        worker_id: String,
        mut config_rx: watch::Receiver<PoolConfig>,
        shutdown_rx: watch::Receiver<bool>,
        retire_rx: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown_rx.borrow() || *retire_rx.borrow() {
                debug!(worker_id, "worker retiring");
                return;
            }

            let poll_interval = config_rx.borrow_and_update().poll_interval_ms;
            tokio::time::sleep(Duration::from_millis(poll_interval)).await;

            if *shutdown_rx.borrow() || *retire_rx.borrow() {
                return;
            }

            let max_concurrent_files = config_rx.borrow().max_concurrent_files;
            if let Err(e) = self.catalog.release_expired_leases().await {
                warn!(worker_id, error = %e, "failed to sweep expired leases");
            }
            if let Err(e) = self.poll_once(&worker_id, max_concurrent_files).await {
                warn!(worker_id, error = %e, "poll cycle failed, backing off");
            }
        }
    }

    async fn poll_once(&self, worker_id: &str, max_concurrent_files: u32) -> CatalogResult<()> {
        let jobs = self.catalog.claimable_jobs().await?;

        for job in jobs {
            let status = JobStatus::from_str(&job.status).unwrap_or(JobStatus::Cancelled);
            if !status.is_claimable() {
                continue;
            }

            let claimed = self
                .catalog
                .claim_pending_items(job.id, worker_id, max_concurrent_files, ITEM_LEASE_MS)
                .await?;

            if claimed.is_empty() {
                if self.catalog.job_items_all_settled(job.id).await? {
                    self.finalize_job(job.id).await?;
                }
                continue;
            }

            if status == JobStatus::Pending {
                self.catalog.set_job_status(job.id, JobStatus::Running, None).await?;
                self.events.emit(Event::JobStarted { job_id: job.id });
            }

            let mut tasks = Vec::with_capacity(claimed.len());
            for item in claimed {
                let catalog = self.catalog.clone();
                let events = self.events.clone();
                tasks.push(tokio::spawn(warm_item(catalog, events, item)));
            }
            for task in tasks {
                let _ = task.await;
            }

            if let Some(refreshed) = self.catalog.get_job(job.id).await? {
                self.maybe_emit_progress(
                    job.id,
                    refreshed.completed_files,
                    refreshed.failed_files,
                    refreshed.total_files,
                )
                .await;
            }

            if self.catalog.job_items_all_settled(job.id).await? {
                self.finalize_job(job.id).await?;
            }
        }

        Ok(())
    }

    /// Publishes `FileProgress`/`JobProgress` (`spec.md` §4.E.7), throttled
    /// to at most every `PROGRESS_EVERY_ITEMS` newly settled items or
    /// `PROGRESS_EVERY_SECS`, whichever comes first.
    async fn maybe_emit_progress(&self, job_id: Uuid, completed_files: i64, failed_files: i64, total_files: i64) {
        let settled = completed_files + failed_files;
        let mut marks = self.progress.lock().await;
        let due = match marks.get(&job_id) {
            Some(mark) => {
                settled - mark.settled_at_last_emit >= PROGRESS_EVERY_ITEMS
                    || mark.last_emit.elapsed() >= Duration::from_secs(PROGRESS_EVERY_SECS)
            }
            None => true,
        };
        if !due {
            return;
        }
        marks.insert(
            job_id,
            ProgressMark {
                settled_at_last_emit: settled,
                last_emit: Instant::now(),
            },
        );
        drop(marks);

        self.events.emit(Event::FileProgress { job_id, completed_files, failed_files, total_files });
        self.events.emit(Event::JobProgress { job_id, completed_files, failed_files, total_files });
    }

    async fn finalize_job(&self, job_id: Uuid) -> CatalogResult<()> {
        let Some(job) = self.catalog.get_job(job_id).await? else {
            return Ok(());
        };
        let status = JobStatus::from_str(&job.status).unwrap_or(JobStatus::Running);
        if status.is_terminal() {
            return Ok(());
        }
        if job.completed_files + job.failed_files < job.total_files {
            return Ok(());
        }

        let new_status = if job.failed_files == 0 {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        self.catalog.set_job_status(job_id, new_status, None).await?;
        self.progress.lock().await.remove(&job_id);

        match new_status {
            JobStatus::Completed => self.events.emit(Event::JobCompleted {
                job_id,
                completed_files: job.completed_files,
            }),
            JobStatus::Failed => self.events.emit(Event::JobFailed {
                job_id,
                failed_files: job.failed_files,
            }),
            _ => {}
        }

        Ok(())
    }
}

async fn warm_item(catalog: Arc<CatalogStore>, events: Arc<EventBus>, item: job_item::Model) {
    let path = PathBuf::from(&item.file_path);
    events.emit(Event::FileStarted {
        job_id: item.job_id,
        item_id: item.id,
        path: path.clone(),
    });

    let result = tokio::time::timeout(Duration::from_secs(READ_TIMEOUT_SECS), warm_read(&path)).await;

    match result {
        Ok(Ok(bytes_read)) => {
            if let Err(e) = catalog
                .complete_item(item.id, ItemOutcome::Completed, Some(bytes_read as i64), None)
                .await
            {
                error!(item_id = item.id, error = %e, "failed to record item completion");
            }
            events.emit(Event::FileCompleted {
                job_id: item.job_id,
                item_id: item.id,
                path: path.clone(),
                size_bytes: bytes_read as i64,
            });
            for ancestor in CatalogStore::ancestor_paths(&item.file_path) {
                if let Err(e) = rollup::update_if_valid(&catalog, &ancestor, rollup::DEFAULT_MAX_DEPTH).await {
                    warn!(ancestor, error = %e, "roll-up failed");
                }
            }
        }
        Ok(Err(e)) => fail_item(&catalog, &events, &item, &path, e.to_string()).await,
        Err(_) => fail_item(&catalog, &events, &item, &path, "read timed out".to_string()).await,
    }
}

async fn fail_item(
    catalog: &CatalogStore,
    events: &EventBus,
    item: &job_item::Model,
    path: &Path,
    message: String,
) {
    if let Err(e) = catalog
        .complete_item(item.id, ItemOutcome::Failed, None, Some(message.clone()))
        .await
    {
        error!(item_id = item.id, error = %e, "failed to record item failure");
    }
    events.emit(Event::FileFailed {
        job_id: item.job_id,
        item_id: item.id,
        path: path.to_path_buf(),
        message,
    });
}

/// Reads a bounded prefix of `path`, forcing the underlying cached
/// filesystem to materialize its content (`spec.md` §4.E.6).
async fn warm_read(path: &Path) -> std::io::Result<usize> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; 8192];
    let mut total = 0usize;
    while total < WARM_READ_BYTES {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
