//! Work queue domain area.
//!
//! The `WorkItem` aggregate owns the job lifecycle state machine
//! (PENDING → SUCCEEDED / DEAD_LETTER); `WorkItemRun` is the append-only
//! audit trail written once per claim. Payloads are a closed tagged union
//! validated at enqueue time.

mod aggregate;
mod errors;
mod payload;
mod repository;

pub use aggregate::{JobStatus, RunStatus, WorkItem, WorkItemRun};
pub use errors::WorkQueueError;
pub use payload::{JobKind, JobPayload, SubmitOrderPayload};
pub use repository::{InsertOutcome, NewWorkItem, RepositoryError, WorkItemRepository};
