//! Work item repository contract.
//!
//! The repository is the single source of truth for retry state. Claiming and
//! insert-with-dedup must be atomic: an eligible item is handed to at most one
//! caller, and at most one non-dead-lettered item exists per idempotency key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::aggregate::{JobStatus, RunStatus, WorkItem, WorkItemRun};
use super::payload::{JobKind, JobPayload};
use crate::domain::shared::JobId;

/// Request to create a work item.
#[derive(Debug, Clone)]
pub struct NewWorkItem {
    /// Typed payload; carries the job type.
    pub payload: JobPayload,
    /// Optional key identifying the intended effect.
    pub idempotency_key: Option<String>,
    /// Attempt ceiling; `None` uses the engine default.
    pub max_attempts: Option<u32>,
}

impl NewWorkItem {
    /// Create a request with no idempotency key.
    #[must_use]
    pub const fn of(payload: JobPayload) -> Self {
        Self {
            payload,
            idempotency_key: None,
            max_attempts: None,
        }
    }

    /// Attach an idempotency key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Override the attempt ceiling.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Outcome of an insert attempt.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// A new row was created.
    Created(WorkItem),
    /// An active item already holds the idempotency key; it is returned
    /// unchanged and no row was created.
    Duplicate(WorkItem),
}

impl InsertOutcome {
    /// The item the caller should use, created or existing.
    #[must_use]
    pub fn into_item(self) -> WorkItem {
        match self {
            Self::Created(item) | Self::Duplicate(item) => item,
        }
    }

    /// Whether the insert deduplicated against an existing item.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Repository failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RepositoryError(pub String);

/// Durable CRUD plus atomic claim for work items and their run audit records.
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    /// Insert a work item, deduplicating on its idempotency key.
    ///
    /// If the item carries a key and a non-dead-lettered item with the same
    /// key exists, no row is created and the existing item is returned.
    async fn insert(&self, item: WorkItem) -> Result<InsertOutcome, RepositoryError>;

    /// Fetch a work item by id.
    async fn find(&self, id: JobId) -> Result<Option<WorkItem>, RepositoryError>;

    /// Atomically select and lease one eligible item
    /// (`status = PENDING && next_run_at <= now`), earliest `next_run_at`
    /// first, optionally filtered by job kind.
    ///
    /// A leased item is not eligible again until its outcome is recorded or
    /// the lease expires, so two workers can never claim the same item.
    async fn claim_next(
        &self,
        kinds: Option<&[JobKind]>,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkItem>, RepositoryError>;

    /// Persist an updated work item.
    async fn update(&self, item: &WorkItem) -> Result<(), RepositoryError>;

    /// Append a run audit record.
    async fn record_run(&self, run: WorkItemRun) -> Result<(), RepositoryError>;

    /// Close the run audit record for (`work_item_id`, `attempt_number`).
    async fn finish_run(
        &self,
        work_item_id: JobId,
        attempt_number: u32,
        status: RunStatus,
        finished_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Runs recorded for a work item, oldest first.
    async fn runs_for(&self, work_item_id: JobId) -> Result<Vec<WorkItemRun>, RepositoryError>;

    /// Most recently updated items, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<WorkItem>, RepositoryError>;

    /// Items in a given status, newest first.
    async fn list_by_status(
        &self,
        status: JobStatus,
        limit: usize,
    ) -> Result<Vec<WorkItem>, RepositoryError>;
}
