//! Errors raised by the Job Coordinator and Worker Pool.

use thiserror::Error;
use uuid::Uuid;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no files to cache: selection resolved to zero files")]
    NoWork,

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("invalid transition for job {job_id}: {reason}")]
    InvalidTransition { job_id: Uuid, reason: String },

    #[error("catalog error: {0}")]
    Catalog(#[from] crate::infrastructure::database::catalog::CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
