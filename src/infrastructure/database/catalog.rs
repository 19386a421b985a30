//! The Catalog Store (`spec.md` §4.A): durable record of every known
//! filesystem entry, cache state, and job state. Exclusive owner of all rows;
//! every public method here is one transactional unit.
//!
//! Modeled on the teacher's `JobDb`
//! (`core-new/src/infrastructure/jobs/database.rs`) — one struct wrapping a
//! `DatabaseConnection`, plain `async fn`s, no trait-object indirection,
//! because this crate has exactly one store implementation.

use super::entities::{entry, index_session, job, job_item, profile};
use crate::domain::metadata::EntryMetadata;
use crate::domain::status::{IndexSessionStatus, JobItemStatus, JobStatus};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use serde_json::json;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// One observed-on-disk entry, awaiting upsert.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub path: String,
    pub parent_path: Option<String>,
    pub name: String,
    pub is_directory: bool,
    pub size: i64,
    pub modified_at: DateTime<Utc>,
    pub permissions: Option<i32>,
}

/// A filesystem-observed `(path, modified_at, size)` triple, as fed to
/// `BatchNeedsIndexing`.
#[derive(Debug, Clone)]
pub struct FsObservation {
    pub path: String,
    pub modified_at: DateTime<Utc>,
    pub size: i64,
}

/// Outcome of warming a single file, as fed to `CompleteItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryCacheStats {
    pub total_files: i64,
    pub cached_files: i64,
    pub subdirs: i64,
    pub cached_subdirs: i64,
    pub should_be_cached: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorySizeStats {
    pub total_bytes: i64,
    pub file_count: i64,
    pub dir_count: i64,
}

/// Tolerance applied to filesystem mtime drift when deciding whether an entry
/// needs re-indexing (`spec.md` §4.A `BatchNeedsIndexing`).
const MTIME_TOLERANCE_MS: i64 = 1000;
/// Statement chunk size for bulk upserts / inserts (`spec.md` §4.A, §4.D).
const CHUNK_SIZE: usize = 1000;

pub struct CatalogStore {
    db: DatabaseConnection,
}

impl CatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Bulk insert-or-update by `path`. Overwrites filesystem-derived fields
    /// on conflict and sets `last_seen_session_id`; preserves the
    /// `upload_status`/`preview_pointer` metadata slots another subsystem may
    /// have written (`SPEC_FULL.md` §3-SUPPLEMENT). Chunked to at most
    /// [`CHUNK_SIZE`] rows per statement, one transaction per chunk.
    pub async fn upsert_entries(
        &self,
        batch: &[NewEntry],
        session_id: Uuid,
    ) -> CatalogResult<Vec<entry::Model>> {
        let mut upserted = Vec::with_capacity(batch.len());

        for chunk in batch.chunks(CHUNK_SIZE) {
            let txn = self.db.begin().await?;

            // Preserve metadata fields the Indexer never writes by reading
            // any existing rows in this chunk first.
            let paths: Vec<String> = chunk.iter().map(|e| e.path.clone()).collect();
            let existing = entry::Entity::find()
                .filter(entry::Column::Path.is_in(paths))
                .all(&txn)
                .await?;
            let existing_by_path: std::collections::HashMap<String, entry::Model> = existing
                .into_iter()
                .map(|m| (m.path.clone(), m))
                .collect();

            let models: Vec<entry::ActiveModel> = chunk
                .iter()
                .map(|new_entry| {
                    let metadata = existing_by_path
                        .get(&new_entry.path)
                        .map(|m| EntryMetadata::from_json(&m.metadata))
                        .unwrap_or_default();
                    let (cached, cached_at, cache_job_id) = existing_by_path
                        .get(&new_entry.path)
                        .map(|m| (m.cached, m.cached_at, m.cache_job_id))
                        .unwrap_or((false, None, None));

                    entry::ActiveModel {
                        path: Set(new_entry.path.clone()),
                        parent_path: Set(new_entry.parent_path.clone()),
                        name: Set(new_entry.name.clone()),
                        is_directory: Set(new_entry.is_directory),
                        size: Set(new_entry.size),
                        modified_at: Set(new_entry.modified_at),
                        permissions: Set(new_entry.permissions),
                        cached: Set(cached),
                        cached_at: Set(cached_at),
                        cache_job_id: Set(cache_job_id),
                        last_seen_session_id: Set(session_id),
                        metadata: Set(metadata.into_json()),
                    }
                })
                .collect();

            if !models.is_empty() {
                entry::Entity::insert_many(models)
                    .on_conflict(
                        OnConflict::column(entry::Column::Path)
                            .update_columns([
                                entry::Column::ParentPath,
                                entry::Column::Name,
                                entry::Column::IsDirectory,
                                entry::Column::Size,
                                entry::Column::ModifiedAt,
                                entry::Column::Permissions,
                                entry::Column::Cached,
                                entry::Column::CachedAt,
                                entry::Column::CacheJobId,
                                entry::Column::LastSeenSessionId,
                                entry::Column::Metadata,
                            ])
                            .to_owned(),
                    )
                    .exec(&txn)
                    .await?;
            }

            txn.commit().await?;

            let refreshed = entry::Entity::find()
                .filter(entry::Column::Path.is_in(chunk.iter().map(|e| e.path.clone())))
                .all(&self.db)
                .await?;
            upserted.extend(refreshed);
        }

        Ok(upserted)
    }

    /// Direct children, directories first then by name (`spec.md` §4.A).
    pub async fn find_children(&self, parent_path: &str) -> CatalogResult<Vec<entry::Model>> {
        let mut children = entry::Entity::find()
            .filter(entry::Column::ParentPath.eq(parent_path))
            .all(&self.db)
            .await?;
        children.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(children)
    }

    /// All non-directory descendants of `dir_path` via a recursive traversal
    /// on `parent_path` (`spec.md` §4.A).
    pub async fn find_files_recursively(&self, dir_path: &str) -> CatalogResult<Vec<entry::Model>> {
        let sql = r#"
            WITH RECURSIVE descendants AS (
                SELECT * FROM entries WHERE parent_path = $1
                UNION ALL
                SELECT e.* FROM entries e
                JOIN descendants d ON e.parent_path = d.path
            )
            SELECT * FROM descendants WHERE is_directory = false
            ORDER BY path ASC
        "#;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            sql,
            [dir_path.into()],
        );
        let rows = entry::Model::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows)
    }

    /// Given filesystem-observed triples, return the subset whose catalog
    /// row is absent, whose mtime drifted beyond tolerance, or whose size
    /// differs (`spec.md` §4.A). Idempotent by construction: it only reads.
    pub async fn batch_needs_indexing(
        &self,
        observations: &[FsObservation],
    ) -> CatalogResult<Vec<FsObservation>> {
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let paths: Vec<String> = observations.iter().map(|o| o.path.clone()).collect();
        let existing = entry::Entity::find()
            .filter(entry::Column::Path.is_in(paths))
            .all(&self.db)
            .await?;
        let existing_by_path: std::collections::HashMap<&str, &entry::Model> = existing
            .iter()
            .map(|m| (m.path.as_str(), m))
            .collect();

        let needs_indexing = observations
            .iter()
            .filter(|obs| match existing_by_path.get(obs.path.as_str()) {
                None => true,
                Some(catalog_row) => {
                    let drift_ms = (obs.modified_at - catalog_row.modified_at)
                        .num_milliseconds()
                        .abs();
                    drift_ms > MTIME_TOLERANCE_MS || obs.size != catalog_row.size
                }
            })
            .cloned()
            .collect();

        Ok(needs_indexing)
    }

    /// Atomically claim up to `limit` pending items for `job_id`, in
    /// ascending `id` order, skipping rows already locked by other workers
    /// (`spec.md` §4.A, §5). The sole mechanism preventing two workers from
    /// executing the same item.
    pub async fn claim_pending_items(
        &self,
        job_id: Uuid,
        worker_id: &str,
        limit: u32,
        lease_ms: i64,
    ) -> CatalogResult<Vec<job_item::Model>> {
        let sql = r#"
            WITH next AS (
                SELECT id FROM job_items
                WHERE job_id = $1 AND status = 'pending'
                ORDER BY id ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE job_items
            SET status = 'running',
                worker_id = $3,
                started_at = now(),
                lease_expires_at = now() + ($4 || ' milliseconds')::interval
            WHERE id IN (SELECT id FROM next)
            RETURNING *
        "#;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            sql,
            [
                job_id.into(),
                (limit as i64).into(),
                worker_id.into(),
                lease_ms.to_string().into(),
            ],
        );
        let claimed = job_item::Model::find_by_statement(stmt).all(&self.db).await?;
        Ok(claimed)
    }

    /// Requeue items whose claim lease has expired back to `pending`
    /// (resolves `spec.md` §9 Open Question 1 via a heartbeat lease).
    /// Returns the number of items requeued.
    pub async fn release_expired_leases(&self) -> CatalogResult<u64> {
        let sql = r#"
            UPDATE job_items
            SET status = 'pending', worker_id = NULL, lease_expires_at = NULL
            WHERE status = 'running' AND lease_expires_at IS NOT NULL AND lease_expires_at < now()
        "#;
        let result = self
            .db
            .execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await?;
        Ok(result.rows_affected())
    }

    /// Set item status to `completed`/`failed` and incrementally update the
    /// owning Job's aggregate counters (`spec.md` §4.A, §5 ordering
    /// guarantee (b)). A full re-aggregation per item does not scale.
    pub async fn complete_item(
        &self,
        item_id: i64,
        outcome: ItemOutcome,
        file_size_bytes: Option<i64>,
        error_message: Option<String>,
    ) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        let item = job_item::Entity::find_by_id(item_id).one(&txn).await?;
        let Some(item) = item else {
            // Internal invariant violation: claimed item vanished. Log and
            // skip rather than crash the worker (`spec.md` §7).
            tracing::error!(item_id, "complete_item: item not found, skipping");
            txn.rollback().await?;
            return Ok(());
        };
        if item.status != JobItemStatus::Running.to_string() {
            tracing::error!(
                item_id,
                status = %item.status,
                "complete_item: item not in running state, skipping"
            );
            txn.rollback().await?;
            return Ok(());
        }

        let status = match outcome {
            ItemOutcome::Completed => JobItemStatus::Completed,
            ItemOutcome::Failed => JobItemStatus::Failed,
        };

        let mut active: job_item::ActiveModel = item.clone().into();
        active.status = Set(status.to_string());
        active.completed_at = Set(Some(Utc::now()));
        active.error_message = Set(error_message);
        active.file_size_bytes = Set(file_size_bytes.or(item.file_size_bytes));
        active.lease_expires_at = Set(None);
        active.update(&txn).await?;

        let (completed_delta, failed_delta, size_delta) = match outcome {
            ItemOutcome::Completed => (1i64, 0i64, file_size_bytes.unwrap_or(0)),
            ItemOutcome::Failed => (0, 1, 0),
        };

        let sql = r#"
            UPDATE jobs
            SET completed_files = completed_files + $2,
                failed_files = failed_files + $3,
                completed_size_bytes = completed_size_bytes + $4
            WHERE id = $1
        "#;
        txn.execute(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            sql,
            [
                item.job_id.into(),
                completed_delta.into(),
                failed_delta.into(),
                size_delta.into(),
            ],
        ))
        .await?;

        if matches!(outcome, ItemOutcome::Completed) {
            if let Some(job) = job::Entity::find_by_id(item.job_id).one(&txn).await? {
                if let Some(size) = file_size_bytes {
                    warm_entry(&txn, &item.file_path, job.id, size).await?;
                }
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Recursive CTE, bounded to `max_depth`, over descendant files/dirs of
    /// `dir_path` (`spec.md` §4.A). `should_be_cached` follows the literal
    /// formula in §4.A; callers applying the write-time convention from §4.F
    /// (empty ⇒ not cached) should use [`CatalogStore::update_directory_cache_if_valid`].
    pub async fn validate_directory_cache_status(
        &self,
        dir_path: &str,
        max_depth: u32,
    ) -> CatalogResult<DirectoryCacheStats> {
        let sql = r#"
            WITH RECURSIVE descendants AS (
                SELECT path, is_directory, cached, 0 AS depth
                FROM entries WHERE parent_path = $1
                UNION ALL
                SELECT e.path, e.is_directory, e.cached, d.depth + 1
                FROM entries e
                JOIN descendants d ON e.parent_path = d.path
                WHERE d.depth < $2
            )
            SELECT
                COUNT(*) FILTER (WHERE NOT is_directory) AS total_files,
                COUNT(*) FILTER (WHERE NOT is_directory AND cached) AS cached_files,
                COUNT(*) FILTER (WHERE is_directory) AS subdirs,
                COUNT(*) FILTER (WHERE is_directory AND cached) AS cached_subdirs
            FROM descendants
        "#;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            sql,
            [dir_path.into(), (max_depth as i64).into()],
        );

        #[derive(Debug, FromQueryResult)]
        struct Row {
            total_files: i64,
            cached_files: i64,
            subdirs: i64,
            cached_subdirs: i64,
        }

        let row = Row::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .unwrap_or(Row {
                total_files: 0,
                cached_files: 0,
                subdirs: 0,
                cached_subdirs: 0,
            });

        let has_descendants = row.total_files > 0 || row.subdirs > 0;
        let all_cached = row.cached_files == row.total_files && row.cached_subdirs == row.subdirs;
        let should_be_cached = !has_descendants || all_cached;

        Ok(DirectoryCacheStats {
            total_files: row.total_files,
            cached_files: row.cached_files,
            subdirs: row.subdirs,
            cached_subdirs: row.cached_subdirs,
            should_be_cached,
        })
    }

    /// Validates, then writes the `cached` flag. Applies the §4.F write-time
    /// convention (a directory with no descendants is never `cached`), which
    /// takes precedence over the raw `should_be_cached` formula for the
    /// empty case — see `DESIGN.md` for why both rules are kept.
    pub async fn update_directory_cache_if_valid(
        &self,
        dir_path: &str,
        max_depth: u32,
    ) -> CatalogResult<(DirectoryCacheStats, bool)> {
        let stats = self.validate_directory_cache_status(dir_path, max_depth).await?;
        let has_descendants = stats.total_files > 0 || stats.subdirs > 0;
        let new_cached = has_descendants && stats.should_be_cached;

        let existing = entry::Entity::find_by_id(dir_path.to_owned())
            .one(&self.db)
            .await?;
        let Some(existing) = existing else {
            return Ok((stats, false));
        };

        let changed = existing.cached != new_cached;
        if changed {
            let mut active: entry::ActiveModel = existing.into();
            active.cached = Set(new_cached);
            if !new_cached {
                active.cache_job_id = Set(None);
                active.cached_at = Set(None);
            }
            active.update(&self.db).await?;
        }

        Ok((stats, changed))
    }

    /// Recursive sum of descendant file sizes plus counts, cached under
    /// `metadata.computed_size` for `ttl_ms` (`spec.md` §4.A).
    pub async fn directory_size(
        &self,
        dir_path: &str,
        ttl_ms: i64,
    ) -> CatalogResult<DirectorySizeStats> {
        let existing = entry::Entity::find_by_id(dir_path.to_owned())
            .one(&self.db)
            .await?;

        if let Some(existing) = &existing {
            let metadata = EntryMetadata::from_json(&existing.metadata);
            if let Some(computed) = &metadata.computed_size {
                if computed.is_fresh(ttl_ms, Utc::now()) {
                    return Ok(DirectorySizeStats {
                        total_bytes: computed.total_bytes,
                        file_count: computed.file_count,
                        dir_count: computed.dir_count,
                    });
                }
            }
        }

        let sql = r#"
            WITH RECURSIVE descendants AS (
                SELECT path, is_directory, size FROM entries WHERE parent_path = $1
                UNION ALL
                SELECT e.path, e.is_directory, e.size FROM entries e
                JOIN descendants d ON e.parent_path = d.path
            )
            SELECT
                COALESCE(SUM(size) FILTER (WHERE NOT is_directory), 0) AS total_bytes,
                COUNT(*) FILTER (WHERE NOT is_directory) AS file_count,
                COUNT(*) FILTER (WHERE is_directory) AS dir_count
            FROM descendants
        "#;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            sql,
            [dir_path.into()],
        );

        #[derive(Debug, FromQueryResult)]
        struct Row {
            total_bytes: i64,
            file_count: i64,
            dir_count: i64,
        }

        let row = Row::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .unwrap_or(Row {
                total_bytes: 0,
                file_count: 0,
                dir_count: 0,
            });

        let stats = DirectorySizeStats {
            total_bytes: row.total_bytes,
            file_count: row.file_count,
            dir_count: row.dir_count,
        };

        if let Some(existing) = existing {
            let mut metadata = EntryMetadata::from_json(&existing.metadata);
            metadata = metadata.merge_computed_size(crate::domain::metadata::ComputedSize {
                total_bytes: stats.total_bytes,
                file_count: stats.file_count,
                dir_count: stats.dir_count,
                calculated_at: Utc::now(),
            });
            let mut active: entry::ActiveModel = existing.into();
            active.metadata = Set(metadata.into_json());
            active.update(&self.db).await?;
        }

        Ok(stats)
    }

    // -- IndexSession -----------------------------------------------------

    pub async fn current_running_session(&self) -> CatalogResult<Option<index_session::Model>> {
        let session = index_session::Entity::find()
            .filter(
                index_session::Column::Status
                    .is_in([IndexSessionStatus::Pending.to_string(), IndexSessionStatus::Running.to_string()]),
            )
            .one(&self.db)
            .await?;
        Ok(session)
    }

    pub async fn create_index_session(&self, root_path: &str) -> CatalogResult<index_session::Model> {
        let model = index_session::ActiveModel {
            id: Set(Uuid::new_v4()),
            root_path: Set(root_path.to_owned()),
            status: Set(IndexSessionStatus::Running.to_string()),
            total_files: Set(0),
            processed_files: Set(0),
            current_path: Set(None),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            error_message: Set(None),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn get_index_session(&self, id: Uuid) -> CatalogResult<Option<index_session::Model>> {
        Ok(index_session::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn update_index_progress(
        &self,
        id: Uuid,
        processed_files: i64,
        current_path: Option<String>,
    ) -> CatalogResult<()> {
        let active = index_session::ActiveModel {
            id: Set(id),
            processed_files: Set(processed_files),
            current_path: Set(current_path),
            ..Default::default()
        };
        index_session::Entity::update(active)
            .filter(index_session::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn finish_index_session(
        &self,
        id: Uuid,
        status: IndexSessionStatus,
        error_message: Option<String>,
    ) -> CatalogResult<()> {
        let active = index_session::ActiveModel {
            id: Set(id),
            status: Set(status.to_string()),
            completed_at: Set(Some(Utc::now())),
            error_message: Set(error_message),
            ..Default::default()
        };
        index_session::Entity::update(active)
            .filter(index_session::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    // -- Profile ------------------------------------------------------------

    pub async fn find_profile_by_id(&self, id: Uuid) -> CatalogResult<Option<profile::Model>> {
        Ok(profile::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_profile_by_name(&self, name: &str) -> CatalogResult<Option<profile::Model>> {
        Ok(profile::Entity::find()
            .filter(profile::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    pub async fn default_profile(&self) -> CatalogResult<Option<profile::Model>> {
        Ok(profile::Entity::find()
            .filter(profile::Column::IsDefault.eq(true))
            .one(&self.db)
            .await?)
    }

    pub async fn list_profiles(&self) -> CatalogResult<Vec<profile::Model>> {
        Ok(profile::Entity::find().all(&self.db).await?)
    }

    // -- Job / JobItem --------------------------------------------------------

    pub async fn create_job(
        &self,
        file_paths: &[String],
        directory_paths: &[String],
        profile_id: Uuid,
    ) -> CatalogResult<job::Model> {
        let model = job::ActiveModel {
            id: Set(Uuid::new_v4()),
            file_paths: Set(json!(file_paths)),
            directory_paths: Set(json!(directory_paths)),
            profile_id: Set(profile_id),
            total_files: Set(file_paths.len() as i64),
            completed_files: Set(0),
            failed_files: Set(0),
            completed_size_bytes: Set(0),
            status: Set(JobStatus::Pending.to_string()),
            worker_id: Set(None),
            created_at: Set(Utc::now()),
            started_at: Set(None),
            completed_at: Set(None),
        };
        let job = model.insert(&self.db).await?;

        for chunk in file_paths.chunks(CHUNK_SIZE) {
            let items: Vec<job_item::ActiveModel> = chunk
                .iter()
                .map(|path| job_item::ActiveModel {
                    id: sea_orm::ActiveValue::NotSet,
                    job_id: Set(job.id),
                    file_path: Set(path.clone()),
                    status: Set(JobItemStatus::Pending.to_string()),
                    worker_id: Set(None),
                    file_size_bytes: Set(None),
                    error_message: Set(None),
                    started_at: Set(None),
                    completed_at: Set(None),
                    lease_expires_at: Set(None),
                })
                .collect();
            if !items.is_empty() {
                job_item::Entity::insert_many(items).exec(&self.db).await?;
            }
        }

        Ok(job)
    }

    pub async fn get_job(&self, id: Uuid) -> CatalogResult<Option<job::Model>> {
        Ok(job::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn get_job_items(&self, job_id: Uuid) -> CatalogResult<Vec<job_item::Model>> {
        Ok(job_item::Entity::find()
            .filter(job_item::Column::JobId.eq(job_id))
            .order_by_asc(job_item::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_jobs(&self, limit: u64) -> CatalogResult<Vec<job::Model>> {
        Ok(job::Entity::find()
            .order_by_desc(job::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Jobs not yet terminal, ordered oldest-first (`spec.md` §4.E.2).
    pub async fn claimable_jobs(&self) -> CatalogResult<Vec<job::Model>> {
        Ok(job::Entity::find()
            .filter(
                job::Column::Status
                    .is_in([JobStatus::Pending.to_string(), JobStatus::Running.to_string()]),
            )
            .order_by_asc(job::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn set_job_status(
        &self,
        id: Uuid,
        status: JobStatus,
        worker_id: Option<&str>,
    ) -> CatalogResult<()> {
        let mut active = job::ActiveModel {
            id: Set(id),
            status: Set(status.to_string()),
            ..Default::default()
        };
        if let Some(worker_id) = worker_id {
            active.worker_id = Set(Some(worker_id.to_owned()));
        }
        match status {
            JobStatus::Running => active.started_at = Set(Some(Utc::now())),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                active.completed_at = Set(Some(Utc::now()))
            }
            _ => {}
        }
        job::Entity::update(active)
            .filter(job::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// True once every item has left `pending`/`running` for this job
    /// (`spec.md` §4.E.8).
    pub async fn job_items_all_settled(&self, job_id: Uuid) -> CatalogResult<bool> {
        let unsettled = job_item::Entity::find()
            .filter(job_item::Column::JobId.eq(job_id))
            .filter(
                job_item::Column::Status
                    .is_in([JobItemStatus::Pending.to_string(), JobItemStatus::Running.to_string()]),
            )
            .count(&self.db)
            .await?;
        Ok(unsettled == 0)
    }

    pub async fn delete_terminal_jobs(&self) -> CatalogResult<u64> {
        let result = job::Entity::delete_many()
            .filter(
                job::Column::Status.is_in([
                    JobStatus::Completed.to_string(),
                    JobStatus::Failed.to_string(),
                    JobStatus::Cancelled.to_string(),
                ]),
            )
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Distinct directory paths that are ancestors of `file_path`, nearest
    /// first, used to schedule roll-up after a warm (`spec.md` §4.F).
    pub fn ancestor_paths(file_path: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        let mut current = std::path::Path::new(file_path).parent();
        while let Some(parent) = current {
            let s = parent.to_string_lossy().to_string();
            if s.is_empty() || !seen.insert(s.clone()) {
                break;
            }
            ancestors.push(s);
            current = parent.parent();
        }
        ancestors
    }
}

async fn warm_entry(
    txn: &sea_orm::DatabaseTransaction,
    path: &str,
    job_id: Uuid,
    _size: i64,
) -> CatalogResult<()> {
    if let Some(existing) = entry::Entity::find_by_id(path.to_owned()).one(txn).await? {
        let mut active: entry::ActiveModel = existing.into();
        active.cached = Set(true);
        active.cached_at = Set(Some(Utc::now()));
        active.cache_job_id = Set(Some(job_id));
        active.update(txn).await?;
    }
    Ok(())
}
