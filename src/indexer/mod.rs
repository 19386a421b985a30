//! Indexer (`spec.md` §4.B).
//!
//! One instance process-wide. A second `start` call while a session is
//! `pending`/`running` fails with `AlreadyRunning`. Structured as an
//! explicit phase state machine, directly modeled on the teacher's
//! `IndexerState`/`Phase` (`operations/indexing/indexer_job.rs`) but
//! simplified to the two phases this spec actually describes — no
//! separate content-identification phase, since content-addressing is out
//! of scope.

pub mod error;
mod walk;

use crate::domain::status::IndexSessionStatus;
use crate::infrastructure::database::catalog::CatalogStore;
use crate::infrastructure::database::entities::index_session;
use crate::infrastructure::events::{Event, EventBus};
use error::{IndexerError, IndexerResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info};
use uuid::Uuid;

struct RunningIndex {
    stop_tx: watch::Sender<bool>,
    #[allow(dead_code)]
    handle: tokio::task::JoinHandle<()>,
}

pub struct Indexer {
    catalog: Arc<CatalogStore>,
    events: Arc<EventBus>,
    batch_size: usize,
    running: Mutex<Option<RunningIndex>>,
    last_session: Mutex<Option<Uuid>>,
}

impl Indexer {
    pub fn new(catalog: Arc<CatalogStore>, events: Arc<EventBus>, batch_size: usize) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            events,
            batch_size,
            running: Mutex::new(None),
            last_session: Mutex::new(None),
        })
    }

    /// `StartIndex(root)` (`spec.md` §6).
    pub async fn start(self: &Arc<Self>, root: PathBuf) -> IndexerResult<Uuid> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(IndexerError::AlreadyRunning);
        }
        if self.catalog.current_running_session().await?.is_some() {
            return Err(IndexerError::AlreadyRunning);
        }

        let session = self.catalog.create_index_session(&root.to_string_lossy()).await?;
        let session_id = session.id;
        *self.last_session.lock().await = Some(session_id);

        let (stop_tx, stop_rx) = watch::channel(false);
        let indexer = self.clone();
        let handle = tokio::spawn(async move {
            indexer.clone().run_session(session_id, root, stop_rx).await;
            *indexer.running.lock().await = None;
        });

        *running = Some(RunningIndex { stop_tx, handle });
        info!(session_id = %session_id, "index session started");
        Ok(session_id)
    }

    async fn run_session(self: Arc<Self>, session_id: Uuid, root: PathBuf, stop_rx: watch::Receiver<bool>) {
        match walk::run(&self.catalog, &self.events, session_id, root, self.batch_size, stop_rx).await {
            Ok(outcome) => {
                let status = if outcome.stopped_early {
                    IndexSessionStatus::Stopped
                } else {
                    IndexSessionStatus::Completed
                };
                if let Err(e) = self.catalog.finish_index_session(session_id, status, None).await {
                    error!(session_id = %session_id, error = %e, "failed to finalize index session");
                }
                if status == IndexSessionStatus::Completed {
                    self.events.emit(Event::IndexComplete {
                        session_id,
                        total_files: outcome.total_files,
                    });
                }
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "index session failed");
                let _ = self
                    .catalog
                    .finish_index_session(session_id, IndexSessionStatus::Failed, Some(e.to_string()))
                    .await;
                self.events.emit(Event::IndexError {
                    session_id,
                    message: e.to_string(),
                });
            }
        }
    }

    /// `StopIndex()` (`spec.md` §6). Cooperative: the walk checks the flag
    /// between batches and between directory enumerations.
    pub async fn stop(&self) -> IndexerResult<()> {
        let running = self.running.lock().await;
        match running.as_ref() {
            Some(r) => {
                let _ = r.stop_tx.send(true);
                Ok(())
            }
            None => Err(IndexerError::NotRunning),
        }
    }

    /// `IndexStatus()` (`spec.md` §6) — the most recent session this
    /// process has started, or `None` if it has never indexed.
    pub async fn status(&self) -> IndexerResult<Option<index_session::Model>> {
        match *self.last_session.lock().await {
            Some(id) => Ok(self.catalog.get_index_session(id).await?),
            None => Ok(None),
        }
    }
}
