// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Execution Queue - Rust Core Library
//!
//! Persistent order-execution work queue for the trading platform. Trading
//! intents (submit order, cancel order, reconcile, kill switch) are enqueued
//! as typed work items and executed against the broker with at-least-once
//! delivery, idempotent submission, classified retries, and dead-lettering.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `work_queue`: WorkItem aggregate, status lifecycle, run audit trail,
//!     typed job payloads, repository contract
//!   - `shared`: Value objects (`Symbol`, `JobId`, order enums)
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`BrokerGatewayPort`,
//!     `EnforcementPort`, `OrderRouterPort`, `AgentStatusPort`, ...)
//!   - `use_cases`: One handler per job kind; `SubmitOrder` carries the full
//!     validation/transformation pipeline
//!   - `services`: `WorkQueueEngine` (sole mutator of work items) and the
//!     single-task `Worker` loop with drain support
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `persistence`: In-memory repository and stores
//!   - `broker`: Mock broker gateway
//!   - `router`: Pass-through order router

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, ports, and queue services.
pub mod application;

/// Infrastructure layer - Adapters and in-memory implementations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting modules
// =============================================================================

/// Typed configuration with serde defaults.
pub mod config;

/// Tracing and metrics initialization.
pub mod observability;

/// Error classification and backoff policy for retries.
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::shared::{JobId, Symbol};
pub use domain::work_queue::{
    JobKind, JobPayload, JobStatus, NewWorkItem, RunStatus, SubmitOrderPayload, WorkItem,
    WorkItemRepository, WorkItemRun, WorkQueueError,
};

// Application re-exports
pub use application::ports::{
    AgentStatus, AgentStatusPort, BrokerError, BrokerGatewayPort, DecisionPort, EnforcementPort,
    OrderRouterPort, OrderScope, OrderStorePort, TradabilityPort,
};
pub use application::services::{DrainOutcome, Worker, WorkerHandle, WorkQueueEngine};
pub use application::use_cases::{HandlerError, Handlers, JobDispatcher, JobSuccess};

// Infrastructure re-exports
pub use infrastructure::broker::MockBrokerGateway;
pub use infrastructure::decision::NoOpDecisionEngine;
pub use infrastructure::enforcement::PermissiveEnforcement;
pub use infrastructure::persistence::{
    InMemoryAgentStatusStore, InMemoryOrderStore, InMemoryWorkItemRepository,
};
pub use infrastructure::router::PassthroughOrderRouter;
