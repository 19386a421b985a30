//! Event bus for decoupled communication (`spec.md` §4.G).
//!
//! Delivery is best-effort, in-process, fan-out to all current subscribers;
//! missed events are not replayed. An external facade forwards these to
//! network clients.

use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Event {
    IndexProgress {
        session_id: Uuid,
        processed_files: i64,
        current_path: Option<String>,
    },
    IndexComplete {
        session_id: Uuid,
        total_files: i64,
    },
    IndexError {
        session_id: Uuid,
        message: String,
    },
    JobCreated {
        job_id: Uuid,
        total_files: i64,
        profile: String,
    },
    JobStarted {
        job_id: Uuid,
    },
    JobCompleted {
        job_id: Uuid,
        completed_files: i64,
    },
    JobFailed {
        job_id: Uuid,
        failed_files: i64,
    },
    FileStarted {
        job_id: Uuid,
        item_id: i64,
        path: PathBuf,
    },
    FileCompleted {
        job_id: Uuid,
        item_id: i64,
        path: PathBuf,
        size_bytes: i64,
    },
    FileFailed {
        job_id: Uuid,
        item_id: i64,
        path: PathBuf,
        message: String,
    },
    /// Throttled per §4.E.7: emitted at most every ~100 items or every 2s.
    FileProgress {
        job_id: Uuid,
        completed_files: i64,
        failed_files: i64,
        total_files: i64,
    },
    JobProgress {
        job_id: Uuid,
        completed_files: i64,
        failed_files: i64,
        total_files: i64,
    },
}

/// Broadcasts [`Event`]s to any number of in-process subscribers.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Ignores send errors — no receivers is not a failure.
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
