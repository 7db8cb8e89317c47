// Storage capabilities consumed by the pipeline
pub mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::filter::{FilterData, FilterError};
use crate::model::Model;
use crate::types::{Operation, Record};

/// Errors from storage collaborators; the pipeline never retries or reinterprets them
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl StorageError {
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::NotFound(_) => 404,
            StorageError::Conflict(_) => 409,
            StorageError::Filter(_) => 400,
            StorageError::QueryError(_) => 500,
            StorageError::Unavailable(_) => 503,
        }
    }
}

/// Options honored by every select
pub use crate::filter::FilterWhereOptions as SelectOptions;

/// Row lookup capability used for preloading
#[async_trait]
pub trait RecordSelect: Send + Sync {
    async fn select(&self, model: &str, filter: FilterData, options: SelectOptions) -> Result<Vec<Record>, StorageError>;
}

/// Mutation capability invoked once at the database ring
#[async_trait]
pub trait RecordPersist: Send + Sync {
    /// Perform `operation` for the batch and return the persisted rows in input order
    async fn persist(&self, operation: Operation, model: &Model, records: Vec<Record>) -> Result<Vec<Record>, StorageError>;
}
