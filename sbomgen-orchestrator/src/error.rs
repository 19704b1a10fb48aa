//! Error types for the orchestration engine

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scheduling or reconciling requests
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A version-checked work object update lost the race
    #[error("work object {0} was updated concurrently")]
    Conflict(Uuid),

    /// Referenced record does not exist
    #[error("record not found: {0}")]
    NotFound(Uuid),

    /// Execution backend rejected or failed an operation
    #[error("execution backend error: {0}")]
    Backend(String),

    /// A stored row could not be decoded into its domain type
    #[error("corrupt record {id}: {detail}")]
    CorruptRecord {
        /// Id of the offending row
        id: Uuid,
        /// What failed to decode
        detail: String,
    },

    /// Domain-level validation failed
    #[error(transparent)]
    Domain(#[from] sbomgen_core::error::DomainError),

    /// A job spec could not be constructed from the stored state
    #[error("invalid job input: {0}")]
    InvalidJobInput(String),
}

impl Error {
    /// Returns true when the error is a lost optimistic-concurrency race
    ///
    /// Conflicts are not failures: the caller simply re-observes on the next
    /// reconciliation pass.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}
