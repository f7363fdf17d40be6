//! Ports - interfaces for external collaborators.
//!
//! The broker connector, trading enforcement, tradability scoring, smart
//! order router, agent status store, decision engine, and order/fill
//! persistence are all external to this subsystem; the queue consumes them
//! through these traits only.

mod broker_port;
mod decision_port;
mod enforcement_port;
mod order_store_port;
mod router_port;
mod status_port;

pub use broker_port::{
    AssetClass, BrokerError, BrokerGatewayPort, BrokerOrder, NewOrderRequest, OrderScope, Position,
    Snapshot,
};
pub use decision_port::{DecisionError, DecisionPort};
pub use enforcement_port::{
    EligibilityDecision, EnforcementError, EnforcementPort, TradabilityDecision, TradabilityPort,
    UniverseSyncReport,
};
pub use order_store_port::{FillRecord, OrderRecord, OrderStoreError, OrderStorePort};
pub use router_port::{OrderRouterPort, RoutedOrder};
pub use status_port::{AgentStatus, AgentStatusPort, StatusError};
