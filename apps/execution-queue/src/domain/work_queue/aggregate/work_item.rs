//! Work item aggregate and run audit records.
//!
//! Status transitions are guarded here; the engine is the only caller and the
//! repository persists whatever the aggregate produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::super::errors::WorkQueueError;
use super::super::payload::{JobKind, JobPayload};
use crate::domain::shared::JobId;

/// Persisted status of a work item.
///
/// There is no persisted RUNNING status: a claim is tracked through
/// `next_run_at` and the run audit trail, and a crash mid-processing leaves
/// the item PENDING so the next claim replays it. The submission pipeline's
/// broker-side duplicate guard makes that replay effect-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting to be claimed (or waiting out a retry backoff).
    Pending,
    /// Terminal: the intended effect happened.
    Succeeded,
    /// Terminal: gave up after a non-retryable failure or the attempt cap.
    DeadLetter,
}

impl JobStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::DeadLetter)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::DeadLetter => write!(f, "DEAD_LETTER"),
        }
    }
}

/// Status of a single run (one claim of a work item).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// The claim is being processed.
    Running,
    /// The run finished with a recorded success.
    Succeeded,
    /// The run finished with a recorded failure.
    Failed,
}

/// Append-only audit record, one per claim, independent of the item's own
/// status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemRun {
    /// The work item this run belongs to.
    pub work_item_id: JobId,
    /// 1-based claim ordinal.
    pub attempt_number: u32,
    /// Run status.
    pub status: RunStatus,
    /// When the claim started processing.
    pub started_at: DateTime<Utc>,
    /// When the outcome was recorded.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkItemRun {
    /// Open a new running audit record.
    #[must_use]
    pub const fn started(work_item_id: JobId, attempt_number: u32, now: DateTime<Utc>) -> Self {
        Self {
            work_item_id,
            attempt_number,
            status: RunStatus::Running,
            started_at: now,
            finished_at: None,
        }
    }
}

/// A unit of intended work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier, assigned at creation.
    pub id: JobId,
    /// Type-specific immutable payload; carries the job type tag.
    pub payload: JobPayload,
    /// Persisted status.
    pub status: JobStatus,
    /// When present, uniquely identifies the intended effect. At most one
    /// non-dead-lettered item may hold a given key.
    pub idempotency_key: Option<String>,
    /// Failures recorded so far.
    pub attempts: u32,
    /// Attempt ceiling before dead-lettering.
    pub max_attempts: u32,
    /// Earliest time the item may be claimed (again).
    pub next_run_at: DateTime<Utc>,
    /// Last failure message, if any.
    pub last_error: Option<String>,
    /// Set once a broker-side order is known to exist for this item.
    pub broker_order_id: Option<String>,
    /// Terminal output payload, set on success.
    pub result: Option<serde_json::Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Create a fresh PENDING item, claimable immediately.
    #[must_use]
    pub fn new(
        payload: JobPayload,
        idempotency_key: Option<String>,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::generate(),
            payload,
            status: JobStatus::Pending,
            idempotency_key,
            attempts: 0,
            max_attempts,
            next_run_at: now,
            last_error: None,
            broker_order_id: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The job type of this item.
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    /// Record a successful outcome: PENDING → SUCCEEDED.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the item is already terminal.
    pub fn mark_succeeded(
        &mut self,
        result: serde_json::Value,
        broker_order_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkQueueError> {
        self.guard_transition(JobStatus::Succeeded)?;
        self.status = JobStatus::Succeeded;
        self.result = Some(result);
        if broker_order_id.is_some() {
            self.broker_order_id = broker_order_id;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// Increments `attempts`; dead-letters when the failure is not retryable
    /// or the attempt ceiling is reached, otherwise stays PENDING with the
    /// supplied retry time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the item is already terminal.
    pub fn record_failure(
        &mut self,
        error: &str,
        retryable: bool,
        next_run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkQueueError> {
        if self.status != JobStatus::Pending {
            return Err(self.invalid_transition(JobStatus::DeadLetter));
        }
        self.attempts += 1;
        self.last_error = Some(error.to_string());
        if !retryable || self.attempts >= self.max_attempts {
            self.status = JobStatus::DeadLetter;
        } else {
            self.next_run_at = next_run_at;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Force DEAD_LETTER regardless of the attempt count.
    ///
    /// Used for non-retryable domain rejections (kill switch active, symbol
    /// not approved, nothing to sell).
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the item is already terminal.
    pub fn dead_letter(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), WorkQueueError> {
        self.guard_transition(JobStatus::DeadLetter)?;
        self.status = JobStatus::DeadLetter;
        self.last_error = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Invalidate a recorded success whose real-world effect later failed
    /// (broker order canceled or rejected out-of-band).
    ///
    /// Moves to DEAD_LETTER and rewrites the idempotency key to a synthetic
    /// unique value so a fresh item with the original key can be enqueued.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the item is SUCCEEDED.
    pub fn invalidate(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), WorkQueueError> {
        if self.status != JobStatus::Succeeded {
            return Err(self.invalid_transition(JobStatus::DeadLetter));
        }
        self.status = JobStatus::DeadLetter;
        self.last_error = Some(reason.to_string());
        self.idempotency_key = Some(format!("invalidated-{}-{}", self.id, now.timestamp_millis()));
        self.updated_at = now;
        Ok(())
    }

    /// Operator action: requeue a dead-lettered item from scratch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the item is DEAD_LETTER.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) -> Result<(), WorkQueueError> {
        if self.status != JobStatus::DeadLetter {
            return Err(self.invalid_transition(JobStatus::Pending));
        }
        self.status = JobStatus::Pending;
        self.attempts = 0;
        self.next_run_at = now;
        self.last_error = None;
        self.updated_at = now;
        Ok(())
    }

    fn guard_transition(&self, to: JobStatus) -> Result<(), WorkQueueError> {
        if self.status.is_terminal() {
            return Err(self.invalid_transition(to));
        }
        Ok(())
    }

    fn invalid_transition(&self, to: JobStatus) -> WorkQueueError {
        WorkQueueError::InvalidTransition {
            id: self.id,
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_item() -> WorkItem {
        WorkItem::new(
            JobPayload::KillSwitch {
                close_positions: false,
            },
            Some("ks-1".to_string()),
            3,
            Utc::now(),
        )
    }

    #[test]
    fn new_item_is_pending_and_claimable() {
        let item = pending_item();
        assert_eq!(item.status, JobStatus::Pending);
        assert_eq!(item.attempts, 0);
        assert!(item.next_run_at <= Utc::now());
    }

    #[test]
    fn mark_succeeded_stores_result_and_broker_id() {
        let mut item = pending_item();
        item.mark_succeeded(
            serde_json::json!({"orderId": "o1"}),
            Some("o1".to_string()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(item.status, JobStatus::Succeeded);
        assert_eq!(item.broker_order_id.as_deref(), Some("o1"));
    }

    #[test]
    fn mark_succeeded_twice_is_invalid() {
        let mut item = pending_item();
        item.mark_succeeded(serde_json::json!({}), None, Utc::now())
            .unwrap();
        let err = item
            .mark_succeeded(serde_json::json!({}), None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, WorkQueueError::InvalidTransition { .. }));
    }

    #[test]
    fn retryable_failure_stays_pending_until_cap() {
        let mut item = pending_item();
        let later = Utc::now() + chrono::Duration::seconds(5);

        item.record_failure("timeout", true, later, Utc::now())
            .unwrap();
        assert_eq!(item.status, JobStatus::Pending);
        assert_eq!(item.attempts, 1);
        assert_eq!(item.next_run_at, later);

        item.record_failure("timeout", true, later, Utc::now())
            .unwrap();
        assert_eq!(item.status, JobStatus::Pending);

        item.record_failure("timeout", true, later, Utc::now())
            .unwrap();
        assert_eq!(item.status, JobStatus::DeadLetter);
        assert_eq!(item.attempts, 3);
    }

    #[test]
    fn non_retryable_failure_dead_letters_immediately() {
        let mut item = pending_item();
        item.record_failure("insufficient buying power", false, Utc::now(), Utc::now())
            .unwrap();
        assert_eq!(item.status, JobStatus::DeadLetter);
        assert_eq!(item.attempts, 1);
        assert_eq!(
            item.last_error.as_deref(),
            Some("insufficient buying power")
        );
    }

    #[test]
    fn invalidate_rewrites_idempotency_key() {
        let mut item = pending_item();
        item.mark_succeeded(serde_json::json!({}), Some("o1".to_string()), Utc::now())
            .unwrap();

        item.invalidate("order canceled out-of-band", Utc::now())
            .unwrap();
        assert_eq!(item.status, JobStatus::DeadLetter);
        let key = item.idempotency_key.clone().unwrap();
        assert!(key.starts_with(&format!("invalidated-{}-", item.id)));
    }

    #[test]
    fn invalidate_requires_succeeded() {
        let mut item = pending_item();
        assert!(item.invalidate("nope", Utc::now()).is_err());
    }

    #[test]
    fn reset_for_retry_only_from_dead_letter() {
        let mut item = pending_item();
        assert!(item.reset_for_retry(Utc::now()).is_err());

        item.dead_letter("kill switch active", Utc::now()).unwrap();
        item.reset_for_retry(Utc::now()).unwrap();
        assert_eq!(item.status, JobStatus::Pending);
        assert_eq!(item.attempts, 0);
        assert!(item.last_error.is_none());
    }
}
