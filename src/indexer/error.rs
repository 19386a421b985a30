//! Errors raised by the Indexer.

use thiserror::Error;

pub type IndexerResult<T> = Result<T, IndexerError>;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("indexer is already running")]
    AlreadyRunning,

    #[error("indexer is not running")]
    NotRunning,

    #[error("catalog error: {0}")]
    Catalog(#[from] crate::infrastructure::database::catalog::CatalogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
