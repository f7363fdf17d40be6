//! Error types for the work queue domain.

use super::repository::RepositoryError;
use crate::domain::shared::JobId;

/// Errors from work queue operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkQueueError {
    /// Work item not found.
    #[error("work item not found: {0}")]
    NotFound(JobId),

    /// The requested status transition is not allowed.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        /// Work item id.
        id: JobId,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Payload failed enqueue-time validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Repository failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
