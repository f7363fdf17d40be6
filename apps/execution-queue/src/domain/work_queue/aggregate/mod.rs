//! Work item aggregate.

mod work_item;

pub use work_item::{JobStatus, RunStatus, WorkItem, WorkItemRun};
