//! Queue services.
//!
//! - [`WorkQueueEngine`]: owns the job lifecycle; the only code that mutates
//!   work items.
//! - [`Worker`]: the single timer-driven loop that claims, dispatches, and
//!   records outcomes, with graceful drain.

mod engine;
mod worker;

pub use engine::WorkQueueEngine;
pub use worker::{DrainOutcome, Worker, WorkerHandle};
