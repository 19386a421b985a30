//! Depth-first directory walk (`spec.md` §4.B.2-4).
//!
//! Uses an explicit `Vec<PathBuf>` stack rather than OS call-stack recursion,
//! so the cooperative-cancellation check can be inserted between any two
//! directory expansions without unwinding a call stack.

use super::error::IndexerError;
use crate::infrastructure::database::catalog::{CatalogStore, FsObservation, NewEntry};
use crate::infrastructure::events::{Event, EventBus};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

/// Progress is published at most every this many accumulated entries
/// (`spec.md` §4.B.4).
const PROGRESS_EVERY: i64 = 100;

pub struct WalkOutcome {
    pub total_files: i64,
    pub stopped_early: bool,
}

/// Runs the traversal rooted at `root`, flushing batches of at most
/// `batch_size` entries through `BatchNeedsIndexing`/`UpsertEntries`.
pub async fn run(
    catalog: &CatalogStore,
    events: &EventBus,
    session_id: Uuid,
    root: PathBuf,
    batch_size: usize,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<WalkOutcome, IndexerError> {
    let mut batch: Vec<NewEntry> = Vec::with_capacity(batch_size);
    let mut processed: i64 = 0;
    let mut since_last_progress: i64 = 0;
    let mut stopped_early = false;

    // The root itself is never anyone's child, so the loop below (which only
    // enumerates directory contents) would never create an Entry row for it.
    // Stat and queue it explicitly before walking its children.
    match tokio::fs::metadata(&root).await {
        Ok(metadata) if metadata.is_dir() => {
            let parent_path = root.parent().map(|p| p.to_string_lossy().into_owned());
            let modified_at = metadata.modified().map(system_time_to_utc).unwrap_or_else(|_| Utc::now());
            let permissions = unix_mode(&metadata);
            batch.push(NewEntry {
                path: root.to_string_lossy().into_owned(),
                parent_path,
                name: root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| root.to_string_lossy().into_owned()),
                is_directory: true,
                size: 0,
                modified_at,
                permissions,
            });
            processed += 1;
            since_last_progress += 1;
        }
        Ok(_) => {
            warn!(path = %root.display(), "index root is not a directory, skipping");
            return Ok(WalkOutcome { total_files: 0, stopped_early: false });
        }
        Err(e) => {
            warn!(path = %root.display(), error = %e, "failed to stat index root");
            return Err(IndexerError::Io(e));
        }
    }

    let mut stack = vec![root];

    'walk: while let Some(dir) = stack.pop() {
        if *stop_rx.borrow_and_update() {
            stopped_early = true;
            break;
        }

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory, skipping");
                continue;
            }
        };

        loop {
            if *stop_rx.borrow_and_update() {
                stopped_early = true;
                break 'walk;
            }

            let entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "failed to read remaining directory entries, skipping rest");
                    break;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "stat failed, skipping");
                    continue;
                }
            };

            let path = entry.path();
            let is_directory = metadata.is_dir();
            if is_directory {
                stack.push(path.clone());
            }

            let size = if is_directory { 0 } else { metadata.len() as i64 };
            let modified_at = metadata.modified().map(system_time_to_utc).unwrap_or_else(|_| Utc::now());
            let permissions = unix_mode(&metadata);

            batch.push(NewEntry {
                path: path.to_string_lossy().into_owned(),
                parent_path: Some(dir.to_string_lossy().into_owned()),
                name,
                is_directory,
                size,
                modified_at,
                permissions,
            });
            processed += 1;
            since_last_progress += 1;

            if since_last_progress >= PROGRESS_EVERY {
                report_progress(catalog, events, session_id, processed, Some(path.to_string_lossy().into_owned())).await;
                since_last_progress = 0;
            }

            if batch.len() >= batch_size {
                flush_batch(catalog, &mut batch, session_id).await?;
            }
        }
    }

    flush_batch(catalog, &mut batch, session_id).await?;
    report_progress(catalog, events, session_id, processed, None).await;

    Ok(WalkOutcome { total_files: processed, stopped_early })
}

async fn flush_batch(
    catalog: &CatalogStore,
    batch: &mut Vec<NewEntry>,
    session_id: Uuid,
) -> Result<(), IndexerError> {
    if batch.is_empty() {
        return Ok(());
    }

    let observations: Vec<FsObservation> = batch
        .iter()
        .map(|e| FsObservation {
            path: e.path.clone(),
            modified_at: e.modified_at,
            size: e.size,
        })
        .collect();
    let needs_indexing = catalog.batch_needs_indexing(&observations).await?;
    let needed: HashSet<&str> = needs_indexing.iter().map(|o| o.path.as_str()).collect();

    let filtered: Vec<NewEntry> = batch.drain(..).filter(|e| needed.contains(e.path.as_str())).collect();
    if !filtered.is_empty() {
        catalog.upsert_entries(&filtered, session_id).await?;
    }
    Ok(())
}

async fn report_progress(
    catalog: &CatalogStore,
    events: &EventBus,
    session_id: Uuid,
    processed_files: i64,
    current_path: Option<String>,
) {
    if let Err(e) = catalog
        .update_index_progress(session_id, processed_files, current_path.clone())
        .await
    {
        warn!(session_id = %session_id, error = %e, "failed to persist index progress");
    }
    events.emit(Event::IndexProgress { session_id, processed_files, current_path });
}

fn system_time_to_utc(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

#[cfg(unix)]
fn unix_mode(metadata: &std::fs::Metadata) -> Option<i32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() as i32)
}

#[cfg(not(unix))]
fn unix_mode(_metadata: &std::fs::Metadata) -> Option<i32> {
    None
}
