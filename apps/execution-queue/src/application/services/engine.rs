//! Work queue engine.
//!
//! Owns the job lifecycle: enqueue-with-dedup, claim, outcome recording, and
//! the operator actions (invalidate, retry-dead-letter). Handlers supply
//! outcomes only; every status/attempts/next_run_at mutation goes through
//! this service and is persisted by the repository.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use crate::domain::shared::JobId;
use crate::domain::work_queue::{
    InsertOutcome, JobKind, JobStatus, NewWorkItem, RunStatus, WorkItem, WorkItemRepository,
    WorkItemRun, WorkQueueError,
};
use crate::observability::metrics;
use crate::retry::BackoffPolicy;

/// Default attempt ceiling for items that do not specify one.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The work queue engine.
pub struct WorkQueueEngine<R>
where
    R: WorkItemRepository,
{
    repo: Arc<R>,
    backoff: BackoffPolicy,
    default_max_attempts: u32,
}

impl<R> WorkQueueEngine<R>
where
    R: WorkItemRepository,
{
    /// Create an engine over the given repository.
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            backoff: BackoffPolicy::new(),
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the default attempt ceiling.
    #[must_use]
    pub const fn with_default_max_attempts(mut self, max_attempts: u32) -> Self {
        self.default_max_attempts = max_attempts;
        self
    }

    /// Enqueue a work item, deduplicating on its idempotency key.
    ///
    /// If an active (non-dead-lettered) item already holds the key, that item
    /// is returned unchanged and nothing new is persisted.
    pub async fn enqueue(&self, new: NewWorkItem) -> Result<WorkItem, WorkQueueError> {
        new.payload
            .validate()
            .map_err(WorkQueueError::InvalidPayload)?;

        let now = Utc::now();
        let max_attempts = new.max_attempts.unwrap_or(self.default_max_attempts);
        let item = WorkItem::new(new.payload, new.idempotency_key, max_attempts, now);
        let kind = item.kind();

        let outcome = self.repo.insert(item).await?;
        match &outcome {
            InsertOutcome::Created(created) => {
                tracing::info!(
                    job_id = %created.id,
                    kind = %kind,
                    idempotency_key = ?created.idempotency_key,
                    "Work item enqueued"
                );
                metrics::record_enqueued(kind, false);
            }
            InsertOutcome::Duplicate(existing) => {
                tracing::info!(
                    job_id = %existing.id,
                    kind = %kind,
                    idempotency_key = ?existing.idempotency_key,
                    "Enqueue deduplicated against active item"
                );
                metrics::record_enqueued(kind, true);
            }
        }
        Ok(outcome.into_item())
    }

    /// Atomically claim the next eligible item, optionally filtered by kind.
    pub async fn claim_next(
        &self,
        kinds: Option<&[JobKind]>,
    ) -> Result<Option<WorkItem>, WorkQueueError> {
        Ok(self.repo.claim_next(kinds, Utc::now()).await?)
    }

    /// Open the run audit record for a fresh claim; returns the 1-based
    /// attempt number.
    pub async fn begin_run(&self, item: &WorkItem) -> Result<u32, WorkQueueError> {
        let attempt_number = item.attempts + 1;
        self.repo
            .record_run(WorkItemRun::started(item.id, attempt_number, Utc::now()))
            .await?;
        Ok(attempt_number)
    }

    /// Close a run audit record.
    pub async fn finish_run(
        &self,
        id: JobId,
        attempt_number: u32,
        status: RunStatus,
    ) -> Result<(), WorkQueueError> {
        Ok(self
            .repo
            .finish_run(id, attempt_number, status, Utc::now())
            .await?)
    }

    /// Record a successful outcome.
    pub async fn mark_succeeded(
        &self,
        id: JobId,
        result: serde_json::Value,
        broker_order_id: Option<String>,
    ) -> Result<WorkItem, WorkQueueError> {
        let mut item = self.fetch(id).await?;
        item.mark_succeeded(result, broker_order_id, Utc::now())?;
        self.repo.update(&item).await?;

        tracing::info!(job_id = %id, kind = %item.kind(), "Work item succeeded");
        metrics::record_outcome(item.kind(), "succeeded");
        Ok(item)
    }

    /// Record a failed attempt.
    ///
    /// Dead-letters when `retryable` is false or the attempt ceiling is
    /// reached; otherwise reschedules with the kind's backoff plus jitter.
    pub async fn mark_failed(
        &self,
        id: JobId,
        error: &str,
        retryable: bool,
    ) -> Result<WorkItem, WorkQueueError> {
        let mut item = self.fetch(id).await?;
        let kind = item.kind();
        let now = Utc::now();
        let delay = self.backoff.delay(kind, item.attempts);
        let next_run_at = now + ChronoDuration::milliseconds(delay.as_millis() as i64);

        item.record_failure(error, retryable, next_run_at, now)?;
        self.repo.update(&item).await?;

        if item.status == JobStatus::DeadLetter {
            tracing::warn!(
                job_id = %id,
                kind = %kind,
                attempts = item.attempts,
                retryable,
                error = %error,
                "Work item dead-lettered"
            );
            metrics::record_outcome(kind, "dead_letter");
        } else {
            tracing::info!(
                job_id = %id,
                kind = %kind,
                attempts = item.attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "Work item scheduled for retry"
            );
            metrics::record_outcome(kind, "retried");
        }
        Ok(item)
    }

    /// Force DEAD_LETTER regardless of the attempt count (non-retryable
    /// domain rejections).
    pub async fn mark_dead_letter(
        &self,
        id: JobId,
        reason: &str,
    ) -> Result<WorkItem, WorkQueueError> {
        let mut item = self.fetch(id).await?;
        item.dead_letter(reason, Utc::now())?;
        self.repo.update(&item).await?;

        tracing::warn!(
            job_id = %id,
            kind = %item.kind(),
            reason = %reason,
            "Work item dead-lettered by domain rejection"
        );
        metrics::record_outcome(item.kind(), "dead_letter");
        Ok(item)
    }

    /// Invalidate a recorded success whose broker order later failed
    /// out-of-band; frees the idempotency key for a fresh enqueue.
    pub async fn invalidate(&self, id: JobId, reason: &str) -> Result<WorkItem, WorkQueueError> {
        let mut item = self.fetch(id).await?;
        item.invalidate(reason, Utc::now())?;
        self.repo.update(&item).await?;

        tracing::warn!(
            job_id = %id,
            kind = %item.kind(),
            reason = %reason,
            new_key = ?item.idempotency_key,
            "Work item invalidated"
        );
        Ok(item)
    }

    /// Operator action: requeue a dead-lettered item from scratch.
    pub async fn retry_dead_letter(&self, id: JobId) -> Result<WorkItem, WorkQueueError> {
        let mut item = self.fetch(id).await?;
        item.reset_for_retry(Utc::now())?;
        self.repo.update(&item).await?;

        tracing::info!(job_id = %id, kind = %item.kind(), "Dead-lettered item requeued");
        Ok(item)
    }

    /// Fetch a work item by id.
    pub async fn get(&self, id: JobId) -> Result<Option<WorkItem>, WorkQueueError> {
        Ok(self.repo.find(id).await?)
    }

    /// Most recently updated items, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<WorkItem>, WorkQueueError> {
        Ok(self.repo.list_recent(limit).await?)
    }

    /// Dead-lettered items, newest first.
    pub async fn list_dead_letter(&self, limit: usize) -> Result<Vec<WorkItem>, WorkQueueError> {
        Ok(self.repo.list_by_status(JobStatus::DeadLetter, limit).await?)
    }

    /// Run audit trail for a work item, oldest first.
    pub async fn runs_for(&self, id: JobId) -> Result<Vec<WorkItemRun>, WorkQueueError> {
        Ok(self.repo.runs_for(id).await?)
    }

    async fn fetch(&self, id: JobId) -> Result<WorkItem, WorkQueueError> {
        self.repo
            .find(id)
            .await?
            .ok_or(WorkQueueError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_queue::JobPayload;
    use crate::infrastructure::persistence::InMemoryWorkItemRepository;

    fn engine() -> WorkQueueEngine<InMemoryWorkItemRepository> {
        WorkQueueEngine::new(Arc::new(InMemoryWorkItemRepository::new()))
    }

    fn sync_orders_job(key: &str) -> NewWorkItem {
        NewWorkItem::of(JobPayload::SyncOrders {
            trace_id: None,
            asset_class: None,
        })
        .with_key(key)
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_per_key() {
        let engine = engine();

        let first = engine.enqueue(sync_orders_job("k1")).await.unwrap();
        let second = engine.enqueue(sync_orders_job("k1")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(engine.list_recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn enqueue_rejects_invalid_payload() {
        let engine = engine();
        let err = engine
            .enqueue(NewWorkItem::of(JobPayload::CancelOrder {
                order_id: String::new(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkQueueError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn transient_failures_dead_letter_at_the_cap() {
        let engine = engine();
        let item = engine
            .enqueue(sync_orders_job("k1").with_max_attempts(3))
            .await
            .unwrap();

        let after_first = engine.mark_failed(item.id, "timeout", true).await.unwrap();
        assert_eq!(after_first.status, JobStatus::Pending);
        assert!(after_first.next_run_at > Utc::now());

        let after_second = engine.mark_failed(item.id, "timeout", true).await.unwrap();
        assert_eq!(after_second.status, JobStatus::Pending);

        let after_third = engine.mark_failed(item.id, "timeout", true).await.unwrap();
        assert_eq!(after_third.status, JobStatus::DeadLetter);
        assert_eq!(after_third.attempts, 3);
        assert_eq!(after_third.last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn non_retryable_failure_short_circuits() {
        let engine = engine();
        let item = engine.enqueue(sync_orders_job("k1")).await.unwrap();

        let failed = engine
            .mark_failed(item.id, "insufficient buying power", false)
            .await
            .unwrap();
        assert_eq!(failed.status, JobStatus::DeadLetter);
        assert_eq!(failed.attempts, 1);
    }

    #[tokio::test]
    async fn invalidate_frees_the_key_for_a_fresh_enqueue() {
        let engine = engine();
        let item = engine.enqueue(sync_orders_job("k1")).await.unwrap();
        engine
            .mark_succeeded(item.id, serde_json::json!({"orderId": "o1"}), None)
            .await
            .unwrap();

        engine
            .invalidate(item.id, "broker order canceled out-of-band")
            .await
            .unwrap();

        let fresh = engine.enqueue(sync_orders_job("k1")).await.unwrap();
        assert_ne!(fresh.id, item.id);
        assert_eq!(fresh.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn retry_dead_letter_resets_bookkeeping() {
        let engine = engine();
        let item = engine.enqueue(sync_orders_job("k1")).await.unwrap();
        engine
            .mark_dead_letter(item.id, "kill switch active")
            .await
            .unwrap();

        let requeued = engine.retry_dead_letter(item.id).await.unwrap();
        assert_eq!(requeued.status, JobStatus::Pending);
        assert_eq!(requeued.attempts, 0);
        assert!(requeued.last_error.is_none());

        // Only valid from DEAD_LETTER.
        let err = engine.retry_dead_letter(item.id).await.unwrap_err();
        assert!(matches!(err, WorkQueueError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn claim_next_skips_backoff_window() {
        let engine = engine();
        let item = engine.enqueue(sync_orders_job("k1")).await.unwrap();
        engine.mark_failed(item.id, "timeout", true).await.unwrap();

        // The item is pending but its next_run_at is in the future.
        let claimed = engine.claim_next(None).await.unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn dead_letter_listing_exposes_last_error() {
        let engine = engine();
        let item = engine.enqueue(sync_orders_job("k1")).await.unwrap();
        engine
            .mark_dead_letter(item.id, "symbol not approved")
            .await
            .unwrap();

        let dead = engine.list_dead_letter(10).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].last_error.as_deref(), Some("symbol not approved"));
    }

    #[tokio::test]
    async fn run_audit_records_per_claim() {
        let engine = engine();
        let item = engine.enqueue(sync_orders_job("k1")).await.unwrap();

        let attempt = engine.begin_run(&item).await.unwrap();
        assert_eq!(attempt, 1);
        engine
            .finish_run(item.id, attempt, RunStatus::Failed)
            .await
            .unwrap();

        let runs = engine.runs_for(item.id).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
    }
}
