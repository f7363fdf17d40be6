//! Typed job payloads.
//!
//! Payloads are a closed tagged union keyed by job type. Each variant carries
//! its own strongly-typed data, so missing-field failures surface at enqueue
//! time instead of at dispatch time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{OrderClass, OrderSide, OrderType, Symbol, TimeInForce};

/// Payload for a SUBMIT_ORDER job.
///
/// Exactly one of `qty` and `notional` is expected; the broker rejects orders
/// carrying both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrderPayload {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Share quantity (fractional allowed during regular hours).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<Decimal>,
    /// Dollar notional, alternative to `qty` for buys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notional: Option<Decimal>,
    /// Requested order type; the router may correct it.
    ///
    /// Serialized as `order_type` so it cannot collide with the union's
    /// `type` tag.
    pub order_type: OrderType,
    /// Requested time in force; the router may correct it.
    pub time_in_force: TimeInForce,
    /// Limit price for limit / stop-limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    /// Stop price for stop / stop-limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Whether extended-hours execution was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_hours: Option<bool>,
    /// Order class (bracket/OTO/OCO).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_class: Option<OrderClass>,
    /// Take-profit limit price for bracket orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_limit_price: Option<Decimal>,
    /// Stop-loss stop price for bracket orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_stop_price: Option<Decimal>,
    /// Correlation id threaded through logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Closed tagged union of job payloads, one variant per job type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPayload {
    /// Submit an order through the validation pipeline.
    SubmitOrder(SubmitOrderPayload),
    /// Cancel a broker order.
    CancelOrder {
        /// Broker order id to cancel.
        order_id: String,
    },
    /// Reconcile local order/fill records with the broker.
    SyncOrders {
        /// Correlation id threaded through logs.
        #[serde(skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
        /// Restrict the sync to one asset class.
        #[serde(skip_serializing_if = "Option::is_none")]
        asset_class: Option<String>,
    },
    /// Close an open position at market.
    ClosePosition {
        /// Symbol of the position to close.
        symbol: Symbol,
        /// Correlation id threaded through logs.
        #[serde(skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
    },
    /// Cancel all orders and optionally flatten all positions.
    KillSwitch {
        /// Also close all open positions.
        #[serde(default)]
        close_positions: bool,
    },
    /// Delegate a trading decision to the decision engine.
    EvaluateDecision {
        /// Decision record to evaluate.
        decision_id: String,
        /// Correlation id threaded through logs.
        #[serde(skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
    },
    /// Refresh the tradable asset universe.
    SyncAssetUniverse {
        /// Correlation id threaded through logs.
        #[serde(skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
        /// Restrict the refresh to one asset class.
        #[serde(skip_serializing_if = "Option::is_none")]
        asset_class: Option<String>,
    },
}

/// Job type discriminant, mirrored from the payload union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    /// SUBMIT_ORDER.
    SubmitOrder,
    /// CANCEL_ORDER.
    CancelOrder,
    /// SYNC_ORDERS.
    SyncOrders,
    /// CLOSE_POSITION.
    ClosePosition,
    /// KILL_SWITCH.
    KillSwitch,
    /// EVALUATE_DECISION.
    EvaluateDecision,
    /// SYNC_ASSET_UNIVERSE.
    SyncAssetUniverse,
}

impl JobKind {
    /// Stable string form used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitOrder => "SUBMIT_ORDER",
            Self::CancelOrder => "CANCEL_ORDER",
            Self::SyncOrders => "SYNC_ORDERS",
            Self::ClosePosition => "CLOSE_POSITION",
            Self::KillSwitch => "KILL_SWITCH",
            Self::EvaluateDecision => "EVALUATE_DECISION",
            Self::SyncAssetUniverse => "SYNC_ASSET_UNIVERSE",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl JobPayload {
    /// The job type this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> JobKind {
        match self {
            Self::SubmitOrder(_) => JobKind::SubmitOrder,
            Self::CancelOrder { .. } => JobKind::CancelOrder,
            Self::SyncOrders { .. } => JobKind::SyncOrders,
            Self::ClosePosition { .. } => JobKind::ClosePosition,
            Self::KillSwitch { .. } => JobKind::KillSwitch,
            Self::EvaluateDecision { .. } => JobKind::EvaluateDecision,
            Self::SyncAssetUniverse { .. } => JobKind::SyncAssetUniverse,
        }
    }

    /// Enqueue-time validation of variant-specific constraints the type
    /// system cannot express.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::SubmitOrder(order) => {
                if order.qty.is_none() && order.notional.is_none() {
                    return Err("submit order requires qty or notional".to_string());
                }
                if order.qty.is_some() && order.notional.is_some() {
                    return Err("submit order accepts qty or notional, not both".to_string());
                }
                if order.qty.is_some_and(|q| q <= Decimal::ZERO) {
                    return Err("qty must be positive".to_string());
                }
                if order.notional.is_some_and(|n| n <= Decimal::ZERO) {
                    return Err("notional must be positive".to_string());
                }
                if order.order_type == OrderType::Limit && order.limit_price.is_none() {
                    return Err("limit order requires limit_price".to_string());
                }
                Ok(())
            }
            Self::CancelOrder { order_id } => {
                if order_id.trim().is_empty() {
                    return Err("cancel order requires order_id".to_string());
                }
                Ok(())
            }
            Self::ClosePosition { symbol, .. } => {
                if symbol.as_str().is_empty() {
                    return Err("close position requires symbol".to_string());
                }
                Ok(())
            }
            Self::EvaluateDecision { decision_id, .. } => {
                if decision_id.trim().is_empty() {
                    return Err("evaluate decision requires decision_id".to_string());
                }
                Ok(())
            }
            Self::SyncOrders { .. } | Self::KillSwitch { .. } | Self::SyncAssetUniverse { .. } => {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market_buy(symbol: &str) -> SubmitOrderPayload {
        SubmitOrderPayload {
            symbol: Symbol::new(symbol),
            side: OrderSide::Buy,
            qty: None,
            notional: Some(dec!(1000)),
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
            stop_price: None,
            extended_hours: None,
            order_class: None,
            take_profit_limit_price: None,
            stop_loss_stop_price: None,
            trace_id: None,
        }
    }

    #[test]
    fn payload_kind_matches_variant() {
        let payload = JobPayload::SubmitOrder(market_buy("AAPL"));
        assert_eq!(payload.kind(), JobKind::SubmitOrder);
        assert_eq!(payload.kind().as_str(), "SUBMIT_ORDER");
    }

    #[test]
    fn payload_serde_tagged_by_type() {
        let payload = JobPayload::KillSwitch {
            close_positions: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "KILL_SWITCH");
        assert_eq!(json["close_positions"], true);
    }

    #[test]
    fn submit_order_payload_wire_shape() {
        let parsed: JobPayload = serde_json::from_value(serde_json::json!({
            "type": "SUBMIT_ORDER",
            "symbol": "AAPL",
            "side": "buy",
            "notional": "1000",
            "order_type": "market",
            "time_in_force": "day"
        }))
        .unwrap();
        assert_eq!(parsed.kind(), JobKind::SubmitOrder);

        let JobPayload::SubmitOrder(order) = parsed else {
            panic!("expected submit order payload");
        };
        assert_eq!(order.notional, Some(dec!(1000)));
        assert!(order.qty.is_none());
    }

    #[test]
    fn validate_rejects_missing_size() {
        let mut order = market_buy("AAPL");
        order.notional = None;
        let payload = JobPayload::SubmitOrder(order);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn validate_rejects_both_sizes() {
        let mut order = market_buy("AAPL");
        order.qty = Some(dec!(10));
        let payload = JobPayload::SubmitOrder(order);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_cancel_id() {
        let payload = JobPayload::CancelOrder {
            order_id: "  ".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn validate_accepts_sync_orders() {
        let payload = JobPayload::SyncOrders {
            trace_id: None,
            asset_class: None,
        };
        assert!(payload.validate().is_ok());
    }
}
