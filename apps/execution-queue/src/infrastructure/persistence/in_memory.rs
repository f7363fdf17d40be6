//! In-memory repository and stores for testing and development.
//!
//! A single mutex over the repository state makes insert-with-dedup and claim
//! atomic, matching the contract a SQL implementation would satisfy with a
//! unique partial index and `SELECT ... FOR UPDATE SKIP LOCKED`.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::ports::{
    AgentStatus, AgentStatusPort, FillRecord, OrderRecord, OrderStoreError, OrderStorePort,
    StatusError,
};
use crate::domain::shared::JobId;
use crate::domain::work_queue::{
    InsertOutcome, JobKind, JobStatus, RepositoryError, RunStatus, WorkItem, WorkItemRepository,
    WorkItemRun,
};

/// How long a claimed item stays ineligible if no outcome is ever recorded
/// (crash mid-processing). After expiry the next claim replays the item.
const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct RepositoryState {
    items: HashMap<JobId, WorkItem>,
    runs: Vec<WorkItemRun>,
}

/// In-memory implementation of `WorkItemRepository`.
///
/// Suitable for testing and development. Not for production use.
#[derive(Debug)]
pub struct InMemoryWorkItemRepository {
    state: Mutex<RepositoryState>,
    claim_lease: Duration,
}

impl Default for InMemoryWorkItemRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkItemRepository {
    /// Create an empty repository with the default claim lease.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RepositoryState::default()),
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    /// Create an empty repository with a custom claim lease.
    #[must_use]
    pub fn with_claim_lease(claim_lease: Duration) -> Self {
        Self {
            state: Mutex::new(RepositoryState::default()),
            claim_lease,
        }
    }

    /// Number of stored work items.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.items.len()).unwrap_or(0)
    }

    /// Whether the repository holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RepositoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError("work item lock poisoned".to_string()))
    }
}

#[async_trait]
impl WorkItemRepository for InMemoryWorkItemRepository {
    async fn insert(&self, item: WorkItem) -> Result<InsertOutcome, RepositoryError> {
        let mut state = self.lock()?;

        if let Some(key) = &item.idempotency_key {
            let existing = state
                .items
                .values()
                .find(|i| {
                    i.status != JobStatus::DeadLetter && i.idempotency_key.as_deref() == Some(key)
                })
                .cloned();
            if let Some(existing) = existing {
                return Ok(InsertOutcome::Duplicate(existing));
            }
        }

        state.items.insert(item.id, item.clone());
        Ok(InsertOutcome::Created(item))
    }

    async fn find(&self, id: JobId) -> Result<Option<WorkItem>, RepositoryError> {
        Ok(self.lock()?.items.get(&id).cloned())
    }

    async fn claim_next(
        &self,
        kinds: Option<&[JobKind]>,
        now: DateTime<Utc>,
    ) -> Result<Option<WorkItem>, RepositoryError> {
        let mut state = self.lock()?;

        let claimed_id = state
            .items
            .values()
            .filter(|item| item.status == JobStatus::Pending && item.next_run_at <= now)
            .filter(|item| kinds.is_none_or(|kinds| kinds.contains(&item.kind())))
            .min_by_key(|item| item.next_run_at)
            .map(|item| item.id);

        let Some(id) = claimed_id else {
            return Ok(None);
        };

        // Lease the item so no other worker can claim it while it processes.
        let lease = chrono::Duration::milliseconds(self.claim_lease.as_millis() as i64);
        let item = state
            .items
            .get_mut(&id)
            .ok_or_else(|| RepositoryError(format!("claimed item {id} disappeared")))?;
        item.next_run_at = now + lease;
        Ok(Some(item.clone()))
    }

    async fn update(&self, item: &WorkItem) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if !state.items.contains_key(&item.id) {
            return Err(RepositoryError(format!("work item {} not found", item.id)));
        }
        state.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn record_run(&self, run: WorkItemRun) -> Result<(), RepositoryError> {
        self.lock()?.runs.push(run);
        Ok(())
    }

    async fn finish_run(
        &self,
        work_item_id: JobId,
        attempt_number: u32,
        status: RunStatus,
        finished_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let run = state
            .runs
            .iter_mut()
            .rev()
            .find(|r| r.work_item_id == work_item_id && r.attempt_number == attempt_number)
            .ok_or_else(|| {
                RepositoryError(format!(
                    "run {attempt_number} for work item {work_item_id} not found"
                ))
            })?;
        run.status = status;
        run.finished_at = Some(finished_at);
        Ok(())
    }

    async fn runs_for(&self, work_item_id: JobId) -> Result<Vec<WorkItemRun>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .runs
            .iter()
            .filter(|r| r.work_item_id == work_item_id)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<WorkItem>, RepositoryError> {
        let state = self.lock()?;
        let mut items: Vec<WorkItem> = state.items.values().cloned().collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        items.truncate(limit);
        Ok(items)
    }

    async fn list_by_status(
        &self,
        status: JobStatus,
        limit: usize,
    ) -> Result<Vec<WorkItem>, RepositoryError> {
        let state = self.lock()?;
        let mut items: Vec<WorkItem> = state
            .items
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        items.truncate(limit);
        Ok(items)
    }
}

/// In-memory implementation of `OrderStorePort`.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<String, OrderRecord>>,
    fills: Mutex<HashMap<String, FillRecord>>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an order record by broker order id.
    pub fn get_order(&self, broker_order_id: &str) -> Option<OrderRecord> {
        self.orders
            .lock()
            .ok()
            .and_then(|orders| orders.get(broker_order_id).cloned())
    }

    /// Number of stored order records.
    pub fn order_count(&self) -> usize {
        self.orders.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Number of stored fill records.
    pub fn fill_count(&self) -> usize {
        self.fills.lock().map(|f| f.len()).unwrap_or(0)
    }
}

#[async_trait]
impl OrderStorePort for InMemoryOrderStore {
    async fn upsert_order(&self, record: OrderRecord) -> Result<(), OrderStoreError> {
        let mut orders = self
            .orders
            .lock()
            .map_err(|_| OrderStoreError("order lock poisoned".to_string()))?;
        orders.insert(record.broker_order_id.clone(), record);
        Ok(())
    }

    async fn find_fill(
        &self,
        broker_order_id: &str,
    ) -> Result<Option<FillRecord>, OrderStoreError> {
        let fills = self
            .fills
            .lock()
            .map_err(|_| OrderStoreError("fill lock poisoned".to_string()))?;
        Ok(fills.get(broker_order_id).cloned())
    }

    async fn insert_fill(&self, fill: FillRecord) -> Result<(), OrderStoreError> {
        let mut fills = self
            .fills
            .lock()
            .map_err(|_| OrderStoreError("fill lock poisoned".to_string()))?;
        fills.insert(fill.broker_order_id.clone(), fill);
        Ok(())
    }
}

/// In-memory implementation of `AgentStatusPort`.
#[derive(Debug)]
pub struct InMemoryAgentStatusStore {
    status: RwLock<AgentStatus>,
}

impl Default for InMemoryAgentStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAgentStatusStore {
    /// Create a store with the kill switch disengaged.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: RwLock::new(AgentStatus::inactive(Utc::now())),
        }
    }

    /// Create a store with the kill switch already engaged.
    #[must_use]
    pub fn with_kill_switch_engaged(reason: impl Into<String>) -> Self {
        Self {
            status: RwLock::new(AgentStatus::engaged(reason, Utc::now())),
        }
    }
}

#[async_trait]
impl AgentStatusPort for InMemoryAgentStatusStore {
    async fn get_status(&self) -> Result<AgentStatus, StatusError> {
        self.status
            .read()
            .map(|status| status.clone())
            .map_err(|_| StatusError("status lock poisoned".to_string()))
    }

    async fn set_status(&self, status: AgentStatus) -> Result<(), StatusError> {
        let mut guard = self
            .status
            .write()
            .map_err(|_| StatusError("status lock poisoned".to_string()))?;
        *guard = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_queue::JobPayload;

    fn item_with_key(key: Option<&str>) -> WorkItem {
        WorkItem::new(
            JobPayload::SyncOrders {
                trace_id: None,
                asset_class: None,
            },
            key.map(ToString::to_string),
            3,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_dedups_on_active_key() {
        let repo = InMemoryWorkItemRepository::new();

        let first = repo.insert(item_with_key(Some("k1"))).await.unwrap();
        assert!(!first.is_duplicate());
        let first = first.into_item();

        let second = repo.insert(item_with_key(Some("k1"))).await.unwrap();
        assert!(second.is_duplicate());
        assert_eq!(second.into_item().id, first.id);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn insert_without_key_never_dedups() {
        let repo = InMemoryWorkItemRepository::new();
        repo.insert(item_with_key(None)).await.unwrap();
        let second = repo.insert(item_with_key(None)).await.unwrap();
        assert!(!second.is_duplicate());
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn dead_lettered_key_is_reusable() {
        let repo = InMemoryWorkItemRepository::new();
        let mut item = item_with_key(Some("k1"));
        item.dead_letter("gave up", Utc::now()).unwrap();
        repo.insert(item).await.unwrap();

        let fresh = repo.insert(item_with_key(Some("k1"))).await.unwrap();
        assert!(!fresh.is_duplicate());
    }

    #[tokio::test]
    async fn claim_leases_the_item() {
        let repo = InMemoryWorkItemRepository::new();
        repo.insert(item_with_key(None)).await.unwrap();

        let now = Utc::now();
        let claimed = repo.claim_next(None, now).await.unwrap();
        assert!(claimed.is_some());

        // Second claim at the same instant finds nothing: the lease moved
        // next_run_at into the future.
        let again = repo.claim_next(None, now).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn claim_respects_kind_filter() {
        let repo = InMemoryWorkItemRepository::new();
        repo.insert(item_with_key(None)).await.unwrap();

        let claimed = repo
            .claim_next(Some(&[JobKind::KillSwitch]), Utc::now())
            .await
            .unwrap();
        assert!(claimed.is_none());

        let claimed = repo
            .claim_next(Some(&[JobKind::SyncOrders]), Utc::now())
            .await
            .unwrap();
        assert!(claimed.is_some());
    }

    #[tokio::test]
    async fn claim_prefers_earliest_next_run_at() {
        let repo = InMemoryWorkItemRepository::new();
        let now = Utc::now();

        let mut early = item_with_key(None);
        early.next_run_at = now - chrono::Duration::seconds(10);
        let early_id = early.id;
        let mut late = item_with_key(None);
        late.next_run_at = now - chrono::Duration::seconds(1);

        repo.insert(late).await.unwrap();
        repo.insert(early).await.unwrap();

        let claimed = repo.claim_next(None, now).await.unwrap().unwrap();
        assert_eq!(claimed.id, early_id);
    }

    #[tokio::test]
    async fn run_audit_lifecycle() {
        let repo = InMemoryWorkItemRepository::new();
        let item = repo.insert(item_with_key(None)).await.unwrap().into_item();

        repo.record_run(WorkItemRun::started(item.id, 1, Utc::now()))
            .await
            .unwrap();
        repo.finish_run(item.id, 1, RunStatus::Succeeded, Utc::now())
            .await
            .unwrap();

        let runs = repo.runs_for(item.id).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Succeeded);
        assert!(runs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn status_store_roundtrip() {
        let store = InMemoryAgentStatusStore::new();
        assert!(!store.get_status().await.unwrap().kill_switch_active);

        store
            .set_status(AgentStatus::engaged("manual", Utc::now()))
            .await
            .unwrap();
        assert!(store.get_status().await.unwrap().kill_switch_active);
    }
}
