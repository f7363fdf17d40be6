//! Retry policy for failed work items.
//!
//! Two pure pieces: a declarative error classifier (ordered pattern table →
//! class) and a per-job-type backoff schedule with jitter.
//!
//! # Retryable vs. non-retryable
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 429 (Rate Limited) | HTTP 400/401/403/422 |
//! | HTTP 5xx (Gateway/Server) | Invalid symbol / quantity |
//! | Network timeouts | Insufficient buying power |
//! | Connection reset | Account blocked |
//! | "temporarily unavailable" | Order rejected by broker |
//!
//! Anything matching neither column is Unknown and retried conservatively up
//! to the attempt ceiling, so unanticipated failures never loop forever but
//! are not discarded prematurely.

mod backoff;
mod classify;

pub use backoff::BackoffPolicy;
pub use classify::{classify, ErrorClass};
