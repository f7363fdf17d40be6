//! Worker loop with graceful drain.
//!
//! A single consuming task drives the queue: claim at most one item per tick,
//! dispatch it, classify any failure, and record the outcome through the
//! engine. Because exactly one task processes items sequentially, the
//! "never more than one cycle in flight" invariant is structural rather than
//! flag-enforced, and the process is bounded to one in-flight broker mutation
//! at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::use_cases::{HandlerError, JobDispatcher};
use crate::config::WorkerConfig;
use crate::domain::work_queue::{RunStatus, WorkItem, WorkItemRepository};
use crate::observability::metrics;
use crate::retry::classify;

use super::engine::WorkQueueEngine;

/// Outcome of a drain request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The in-flight cycle (if any) finished and the loop stopped.
    Completed,
    /// The drain timeout elapsed with work still in flight. The loop task is
    /// left running rather than aborted: an in-flight broker call is never
    /// interrupted mid-flight.
    TimedOut,
}

/// Handle to a running worker loop.
pub struct WorkerHandle {
    shutdown: CancellationToken,
    join: JoinHandle<()>,
    drain_timeout: Duration,
}

impl WorkerHandle {
    /// Stop the timer, then wait (bounded by the drain timeout) for any
    /// in-flight cycle to finish.
    pub async fn drain(self) -> DrainOutcome {
        tracing::info!("Worker drain requested");
        self.shutdown.cancel();

        match tokio::time::timeout(self.drain_timeout, self.join).await {
            Ok(Ok(())) => {
                tracing::info!("Worker drained");
                DrainOutcome::Completed
            }
            Ok(Err(join_error)) => {
                tracing::error!(error = %join_error, "Worker task ended abnormally during drain");
                DrainOutcome::Completed
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.drain_timeout.as_secs(),
                    "Drain timeout elapsed with work still in flight"
                );
                DrainOutcome::TimedOut
            }
        }
    }
}

/// The timer-driven worker.
pub struct Worker;

impl Worker {
    /// Spawn the worker loop.
    pub fn spawn<R, H>(
        engine: Arc<WorkQueueEngine<R>>,
        dispatcher: Arc<H>,
        config: &WorkerConfig,
    ) -> WorkerHandle
    where
        R: WorkItemRepository + 'static,
        H: JobDispatcher + 'static,
    {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        let drain_timeout = Duration::from_secs(config.drain_timeout_secs);

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                poll_interval_ms = poll_interval.as_millis() as u64,
                "Worker loop started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        run_cycle(&engine, dispatcher.as_ref()).await;
                    }
                    () = token.cancelled() => {
                        tracing::info!("Worker loop stopping");
                        break;
                    }
                }
            }
        });

        WorkerHandle {
            shutdown,
            join,
            drain_timeout,
        }
    }
}

/// One worker cycle: claim, dispatch, record.
async fn run_cycle<R, H>(engine: &WorkQueueEngine<R>, dispatcher: &H)
where
    R: WorkItemRepository,
    H: JobDispatcher,
{
    let item = match engine.claim_next(None).await {
        Ok(Some(item)) => item,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(error = %e, "Claim failed; will retry next tick");
            return;
        }
    };

    let started = Instant::now();
    let attempt_number = match engine.begin_run(&item).await {
        Ok(n) => n,
        Err(e) => {
            // Audit insert failure must not stall the queue; process anyway.
            tracing::error!(job_id = %item.id, error = %e, "Failed to open run audit record");
            item.attempts + 1
        }
    };

    tracing::debug!(
        job_id = %item.id,
        kind = %item.kind(),
        attempt = attempt_number,
        "Processing work item"
    );

    let outcome = std::panic::AssertUnwindSafe(dispatcher.dispatch(&item))
        .catch_unwind()
        .await;
    let run_status = record_outcome(engine, &item, outcome).await;

    if let Err(e) = engine.finish_run(item.id, attempt_number, run_status).await {
        tracing::error!(job_id = %item.id, error = %e, "Failed to close run audit record");
    }

    metrics::record_cycle_duration(started.elapsed());
}

/// Map a dispatch outcome onto the engine and return the run status.
async fn record_outcome<R>(
    engine: &WorkQueueEngine<R>,
    item: &WorkItem,
    outcome: Result<
        Result<crate::application::use_cases::JobSuccess, HandlerError>,
        Box<dyn std::any::Any + Send>,
    >,
) -> RunStatus
where
    R: WorkItemRepository,
{
    let (record_result, run_status) = match outcome {
        Ok(Ok(success)) => (
            engine
                .mark_succeeded(item.id, success.result, success.broker_order_id)
                .await
                .map(|_| ()),
            RunStatus::Succeeded,
        ),
        Ok(Err(HandlerError::Rejected(reason))) => (
            engine.mark_dead_letter(item.id, &reason).await.map(|_| ()),
            RunStatus::Failed,
        ),
        Ok(Err(e)) => {
            let message = e.to_string();
            let class = classify(&message);
            tracing::debug!(
                job_id = %item.id,
                error = %message,
                class = ?class,
                "Handler failure classified"
            );
            (
                engine
                    .mark_failed(item.id, &message, class.is_retryable())
                    .await
                    .map(|_| ()),
                RunStatus::Failed,
            )
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            (
                engine
                    .mark_failed(item.id, &format!("handler panicked: {message}"), true)
                    .await
                    .map(|_| ()),
                RunStatus::Failed,
            )
        }
    };

    if let Err(e) = record_result {
        tracing::error!(
            job_id = %item.id,
            run_status = ?run_status,
            error = %e,
            "Failed to record work item outcome"
        );
    }
    run_status
}

/// Extract a printable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::JobSuccess;
    use crate::domain::work_queue::{JobPayload, JobStatus, NewWorkItem};
    use crate::infrastructure::persistence::InMemoryWorkItemRepository;

    fn sync_orders_job() -> NewWorkItem {
        NewWorkItem::of(JobPayload::SyncOrders {
            trace_id: None,
            asset_class: None,
        })
    }

    async fn engine_with_repo() -> Arc<WorkQueueEngine<InMemoryWorkItemRepository>> {
        Arc::new(WorkQueueEngine::new(Arc::new(
            InMemoryWorkItemRepository::new(),
        )))
    }

    struct PanickingDispatcher;

    #[async_trait::async_trait]
    impl JobDispatcher for PanickingDispatcher {
        async fn dispatch(&self, _item: &WorkItem) -> Result<JobSuccess, HandlerError> {
            panic!("handler blew up");
        }
    }

    struct RejectingDispatcher;

    #[async_trait::async_trait]
    impl JobDispatcher for RejectingDispatcher {
        async fn dispatch(&self, _item: &WorkItem) -> Result<JobSuccess, HandlerError> {
            Err(HandlerError::Rejected("kill switch active".to_string()))
        }
    }

    struct SucceedingDispatcher;

    #[async_trait::async_trait]
    impl JobDispatcher for SucceedingDispatcher {
        async fn dispatch(&self, _item: &WorkItem) -> Result<JobSuccess, HandlerError> {
            Ok(JobSuccess::of(serde_json::json!({"ok": true})))
        }
    }

    #[tokio::test]
    async fn empty_queue_cycle_is_a_no_op() {
        let engine = engine_with_repo().await;
        run_cycle(&engine, &SucceedingDispatcher).await;
    }

    #[tokio::test]
    async fn successful_dispatch_marks_item_succeeded() {
        let engine = engine_with_repo().await;
        let item = engine.enqueue(sync_orders_job()).await.unwrap();

        run_cycle(&engine, &SucceedingDispatcher).await;

        let after = engine.get(item.id).await.unwrap().unwrap();
        assert_eq!(after.status, JobStatus::Succeeded);
        assert_eq!(after.result, Some(serde_json::json!({"ok": true})));

        let runs = engine.runs_for(item.id).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn rejected_dispatch_dead_letters_immediately() {
        let engine = engine_with_repo().await;
        let item = engine.enqueue(sync_orders_job()).await.unwrap();

        run_cycle(&engine, &RejectingDispatcher).await;

        let after = engine.get(item.id).await.unwrap().unwrap();
        assert_eq!(after.status, JobStatus::DeadLetter);
        assert_eq!(after.attempts, 0);
        assert_eq!(after.last_error.as_deref(), Some("kill switch active"));
    }

    #[tokio::test]
    async fn panicking_dispatch_is_contained_and_retried() {
        let engine = engine_with_repo().await;
        let item = engine.enqueue(sync_orders_job()).await.unwrap();

        run_cycle(&engine, &PanickingDispatcher).await;

        let after = engine.get(item.id).await.unwrap().unwrap();
        assert_eq!(after.status, JobStatus::Pending);
        assert_eq!(after.attempts, 1);
        assert!(
            after
                .last_error
                .as_deref()
                .is_some_and(|e| e.contains("panicked")),
            "unexpected last_error: {:?}",
            after.last_error
        );

        let runs = engine.runs_for(item.id).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
    }
}
