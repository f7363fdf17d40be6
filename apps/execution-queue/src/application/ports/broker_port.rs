//! Broker Gateway Port (Driven Port)
//!
//! Interface for order submission, cancellation, and position/order queries
//! against the trading venue. One gateway is assumed; multi-broker
//! abstraction is a non-goal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::shared::{OrderClass, OrderSide, OrderType, Symbol, TimeInForce};

/// Asset class for data-path selection (equities and crypto use different
/// market-data endpoints).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// US equities.
    UsEquity,
    /// Crypto pairs.
    Crypto,
}

impl AssetClass {
    /// Derive the asset class from a symbol's form.
    #[must_use]
    pub fn of(symbol: &Symbol) -> Self {
        if symbol.is_crypto() {
            Self::Crypto
        } else {
            Self::UsEquity
        }
    }
}

/// Which broker orders to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Currently open orders.
    Open,
    /// Recently closed orders (filled, canceled, rejected, expired).
    Closed,
}

/// Final, validated order parameters submitted to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    /// Client-assigned order id; resubmitting the same id is a no-op at the
    /// broker.
    pub client_order_id: String,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Share quantity. Exactly one of `qty` and `notional` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<Decimal>,
    /// Dollar notional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notional: Option<Decimal>,
    /// Order type.
    pub order_type: OrderType,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Limit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    /// Stop price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Extended-hours flag.
    pub extended_hours: bool,
    /// Order class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_class: Option<OrderClass>,
    /// Take-profit limit price for bracket orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_limit_price: Option<Decimal>,
    /// Stop-loss stop price for bracket orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_stop_price: Option<Decimal>,
}

/// An order as known to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerOrder {
    /// Broker-assigned order id.
    pub id: String,
    /// Client order id echoed back.
    pub client_order_id: String,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Requested quantity, if share-denominated.
    pub qty: Option<Decimal>,
    /// Broker status string ("accepted", "filled", "canceled", ...).
    pub status: String,
    /// Cumulative filled quantity.
    pub filled_qty: Decimal,
    /// Average fill price, once any quantity filled.
    pub filled_avg_price: Option<Decimal>,
    /// Submission time at the broker.
    pub submitted_at: DateTime<Utc>,
}

/// An open position at the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Symbol.
    pub symbol: Symbol,
    /// Total signed quantity.
    pub qty: Decimal,
    /// Quantity available to close (total minus held-for-orders).
    pub qty_available: Decimal,
    /// Average entry price.
    pub avg_entry_price: Decimal,
}

/// Current market prices for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Best bid.
    pub bid: Option<Decimal>,
    /// Best ask.
    pub ask: Option<Decimal>,
    /// Last trade price.
    pub last: Option<Decimal>,
}

impl Snapshot {
    /// Best available reference price: last trade, then mid, then either side.
    #[must_use]
    pub fn reference_price(&self) -> Option<Decimal> {
        if let Some(last) = self.last {
            return Some(last);
        }
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(price), None) | (None, Some(price)) => Some(price),
            (None, None) => None,
        }
    }
}

/// Broker gateway error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Order was rejected by the broker.
    #[error("order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The missing order id.
        order_id: String,
    },

    /// Position not found.
    #[error("no position for {symbol}")]
    PositionNotFound {
        /// The symbol with no open position.
        symbol: String,
    },

    /// Rate limited.
    #[error("rate limited by broker (429)")]
    RateLimited,

    /// Transport or venue failure.
    #[error("broker api error: {message}")]
    Api {
        /// Error details, including any HTTP status.
        message: String,
    },
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerGatewayPort: Send + Sync {
    /// Submit an order with final, validated parameters.
    async fn create_order(&self, request: NewOrderRequest) -> Result<BrokerOrder, BrokerError>;

    /// Cancel an order by broker order id.
    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError>;

    /// Cancel all open orders; returns the number of cancel requests issued.
    async fn cancel_all_orders(&self) -> Result<usize, BrokerError>;

    /// Fetch orders in the given scope, newest first, up to `limit`.
    async fn get_orders(
        &self,
        scope: OrderScope,
        limit: usize,
    ) -> Result<Vec<BrokerOrder>, BrokerError>;

    /// Fetch all open positions.
    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Close the position for a symbol at market.
    async fn close_position(&self, symbol: &Symbol) -> Result<BrokerOrder, BrokerError>;

    /// Best-effort current prices for the given symbols.
    async fn get_snapshots(
        &self,
        symbols: &[Symbol],
        asset_class: AssetClass,
    ) -> Result<HashMap<String, Snapshot>, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn asset_class_from_symbol() {
        assert_eq!(AssetClass::of(&Symbol::new("AAPL")), AssetClass::UsEquity);
        assert_eq!(AssetClass::of(&Symbol::new("BTC/USD")), AssetClass::Crypto);
    }

    #[test]
    fn snapshot_prefers_last_trade() {
        let snapshot = Snapshot {
            bid: Some(dec!(99)),
            ask: Some(dec!(101)),
            last: Some(dec!(100.5)),
        };
        assert_eq!(snapshot.reference_price(), Some(dec!(100.5)));
    }

    #[test]
    fn snapshot_falls_back_to_mid() {
        let snapshot = Snapshot {
            bid: Some(dec!(99)),
            ask: Some(dec!(101)),
            last: None,
        };
        assert_eq!(snapshot.reference_price(), Some(dec!(100)));
    }

    #[test]
    fn snapshot_with_no_prices() {
        let snapshot = Snapshot {
            bid: None,
            ask: None,
            last: None,
        };
        assert_eq!(snapshot.reference_price(), None);
    }
}
