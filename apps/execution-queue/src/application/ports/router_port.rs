//! Smart Order Router Port (Driven Port)
//!
//! The router is a pure transform: given an order intent and current prices
//! it returns a corrected order whose job is to make the order acceptable to
//! the venue rather than reject it outright.

use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

use super::broker_port::Snapshot;
use crate::domain::shared::{OrderClass, OrderType, TimeInForce};
use crate::domain::work_queue::SubmitOrderPayload;

/// Corrected order returned by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedOrder {
    /// Corrected order type.
    pub order_type: OrderType,
    /// Corrected time in force.
    pub time_in_force: TimeInForce,
    /// Computed limit price, when the corrected type needs one.
    pub limit_price: Option<Decimal>,
    /// Whether the order should run in the extended-hours session.
    pub extended_hours: bool,
    /// Corrected order class.
    pub order_class: Option<OrderClass>,
    /// Take-profit limit price carried through for bracket orders.
    pub take_profit_limit_price: Option<Decimal>,
    /// Stop-loss stop price carried through for bracket orders.
    pub stop_loss_stop_price: Option<Decimal>,
    /// Market session label ("regular", "extended").
    pub session: String,
    /// Transformations applied, for the structured log trail.
    pub transformations: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

/// Port for the smart order router.
///
/// Implementations must be pure with respect to the queue: no side effects,
/// no persistence, deterministic for a given (intent, prices) pair.
pub trait OrderRouterPort: Send + Sync {
    /// Transform an order intent using current prices.
    fn transform(&self, order: &SubmitOrderPayload, prices: Option<&Snapshot>) -> RoutedOrder;
}
