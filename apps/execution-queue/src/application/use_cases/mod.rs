//! Use cases - one handler per job kind.
//!
//! Handlers never touch work-item persistence: they return an outcome
//! (success payload or a typed failure) and the worker records it through the
//! engine.

mod cancel_order;
mod close_position;
mod evaluate_decision;
mod kill_switch;
mod submit_order;
mod sync_orders;
mod sync_universe;

pub use cancel_order::CancelOrderUseCase;
pub use close_position::ClosePositionUseCase;
pub use evaluate_decision::EvaluateDecisionUseCase;
pub use kill_switch::KillSwitchUseCase;
pub use submit_order::SubmitOrderUseCase;
pub use sync_orders::SyncOrdersUseCase;
pub use sync_universe::SyncUniverseUseCase;

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{
    AgentStatusPort, BrokerError, BrokerGatewayPort, DecisionError, DecisionPort, EnforcementError,
    EnforcementPort, OrderRouterPort, OrderStoreError, OrderStorePort, StatusError,
    TradabilityPort,
};
use crate::domain::work_queue::{JobPayload, WorkItem};

/// Successful handler outcome.
#[derive(Debug, Clone)]
pub struct JobSuccess {
    /// Terminal output payload stored on the work item.
    pub result: serde_json::Value,
    /// Broker order id to record on the item, when one is known.
    pub broker_order_id: Option<String>,
}

impl JobSuccess {
    /// Success with a result payload only.
    #[must_use]
    pub const fn of(result: serde_json::Value) -> Self {
        Self {
            result,
            broker_order_id: None,
        }
    }

    /// Success that produced (or found) a broker order.
    #[must_use]
    pub fn with_order(result: serde_json::Value, broker_order_id: impl Into<String>) -> Self {
        Self {
            result,
            broker_order_id: Some(broker_order_id.into()),
        }
    }
}

/// Failed handler outcome.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Domain rejection: retrying cannot help, the item dead-letters
    /// immediately (kill switch active, symbol not approved, nothing to
    /// sell).
    #[error("{0}")]
    Rejected(String),

    /// Broker gateway failure; the worker classifies the message to decide
    /// retryability.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Non-broker collaborator failure; classified like a broker failure.
    #[error("{0}")]
    Collaborator(String),
}

impl From<EnforcementError> for HandlerError {
    fn from(err: EnforcementError) -> Self {
        Self::Collaborator(err.to_string())
    }
}

impl From<StatusError> for HandlerError {
    fn from(err: StatusError) -> Self {
        Self::Collaborator(err.to_string())
    }
}

impl From<DecisionError> for HandlerError {
    fn from(err: DecisionError) -> Self {
        Self::Collaborator(err.to_string())
    }
}

impl From<OrderStoreError> for HandlerError {
    fn from(err: OrderStoreError) -> Self {
        Self::Collaborator(err.to_string())
    }
}

/// Dispatches a claimed work item to the handler for its job kind.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Process one claimed work item.
    async fn dispatch(&self, item: &WorkItem) -> Result<JobSuccess, HandlerError>;
}

/// The full handler set wired over concrete port implementations.
pub struct Handlers<G, E, T, R, S, O, D>
where
    G: BrokerGatewayPort,
    E: EnforcementPort,
    T: TradabilityPort,
    R: OrderRouterPort,
    S: AgentStatusPort,
    O: OrderStorePort,
    D: DecisionPort,
{
    submit_order: SubmitOrderUseCase<G, E, T, R, S, O>,
    cancel_order: CancelOrderUseCase<G>,
    close_position: ClosePositionUseCase<G>,
    sync_orders: SyncOrdersUseCase<G, O>,
    kill_switch: KillSwitchUseCase<G, S>,
    evaluate_decision: EvaluateDecisionUseCase<D>,
    sync_universe: SyncUniverseUseCase<E>,
}

impl<G, E, T, R, S, O, D> Handlers<G, E, T, R, S, O, D>
where
    G: BrokerGatewayPort,
    E: EnforcementPort,
    T: TradabilityPort,
    R: OrderRouterPort,
    S: AgentStatusPort,
    O: OrderStorePort,
    D: DecisionPort,
{
    /// Wire every handler over the given ports.
    pub fn new(
        gateway: Arc<G>,
        enforcement: Arc<E>,
        tradability: Arc<T>,
        router: Arc<R>,
        status: Arc<S>,
        orders: Arc<O>,
        decisions: Arc<D>,
    ) -> Self {
        Self {
            submit_order: SubmitOrderUseCase::new(
                Arc::clone(&gateway),
                Arc::clone(&enforcement),
                tradability,
                router,
                Arc::clone(&status),
                Arc::clone(&orders),
            ),
            cancel_order: CancelOrderUseCase::new(Arc::clone(&gateway)),
            close_position: ClosePositionUseCase::new(Arc::clone(&gateway)),
            sync_orders: SyncOrdersUseCase::new(Arc::clone(&gateway), orders),
            kill_switch: KillSwitchUseCase::new(gateway, status),
            evaluate_decision: EvaluateDecisionUseCase::new(decisions),
            sync_universe: SyncUniverseUseCase::new(enforcement),
        }
    }
}

#[async_trait]
impl<G, E, T, R, S, O, D> JobDispatcher for Handlers<G, E, T, R, S, O, D>
where
    G: BrokerGatewayPort,
    E: EnforcementPort,
    T: TradabilityPort,
    R: OrderRouterPort,
    S: AgentStatusPort,
    O: OrderStorePort,
    D: DecisionPort,
{
    async fn dispatch(&self, item: &WorkItem) -> Result<JobSuccess, HandlerError> {
        match &item.payload {
            JobPayload::SubmitOrder(order) => self.submit_order.execute(item, order).await,
            JobPayload::CancelOrder { order_id } => self.cancel_order.execute(order_id).await,
            JobPayload::ClosePosition { symbol, .. } => self.close_position.execute(symbol).await,
            JobPayload::SyncOrders { trace_id, .. } => {
                self.sync_orders.execute(trace_id.as_deref()).await
            }
            JobPayload::KillSwitch { close_positions } => {
                self.kill_switch.execute(*close_positions).await
            }
            JobPayload::EvaluateDecision {
                decision_id,
                trace_id,
            } => {
                self.evaluate_decision
                    .execute(decision_id, trace_id.as_deref())
                    .await
            }
            JobPayload::SyncAssetUniverse { asset_class, .. } => {
                self.sync_universe.execute(asset_class.as_deref()).await
            }
        }
    }
}
