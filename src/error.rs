//! Top-level error taxonomy for the engine's external contract.
//!
//! Validation errors here are surfaced verbatim to callers with no state
//! change. Transient and fatal errors are never represented by this type —
//! they are recorded on the affected `IndexSession`/`Job` row instead (see
//! `infrastructure::jobs::error` and `indexer::error`).

use thiserror::Error;
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("path '{0}' is outside the configured allow-list")]
    PathDenied(String),

    #[error("no files to cache: selection resolved to zero files")]
    NoWork,

    #[error("job {0} not found")]
    JobNotFound(Uuid),

    #[error("invalid job transition: {0}")]
    InvalidTransition(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("path '{0}' is not a directory")]
    NotADirectory(String),

    #[error("indexer is already running")]
    AlreadyRunning,

    #[error("indexer is not running")]
    NotRunning,

    #[error("catalog error: {0}")]
    Catalog(#[from] crate::infrastructure::database::catalog::CatalogError),

    #[error("indexer error: {0}")]
    Indexer(#[from] crate::indexer::error::IndexerError),

    #[error("job error: {0}")]
    Job(#[from] crate::infrastructure::jobs::error::JobError),
}
