//! Order Store Port (Driven Port)
//!
//! Local order and fill records are written through an abstract repository;
//! the storage engine itself is out of scope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::broker_port::BrokerOrder;
use crate::domain::shared::{OrderSide, Symbol};

/// Local record of a broker order, keyed by broker order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Broker-assigned order id (primary key).
    pub broker_order_id: String,
    /// Client order id.
    pub client_order_id: String,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Requested quantity, if share-denominated.
    pub qty: Option<Decimal>,
    /// Broker status string.
    pub status: String,
    /// Cumulative filled quantity.
    pub filled_qty: Decimal,
    /// Average fill price.
    pub filled_avg_price: Option<Decimal>,
    /// Submission time at the broker.
    pub submitted_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Build a record from the broker's view of an order.
    #[must_use]
    pub fn from_broker(order: &BrokerOrder) -> Self {
        Self {
            broker_order_id: order.id.clone(),
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            qty: order.qty,
            status: order.status.clone(),
            filled_qty: order.filled_qty,
            filled_avg_price: order.filled_avg_price,
            submitted_at: order.submitted_at,
        }
    }
}

/// Local record of an execution fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    /// Broker order id the fill belongs to.
    pub broker_order_id: String,
    /// Filled quantity.
    pub qty: Decimal,
    /// Fill price.
    pub price: Decimal,
    /// When the fill was recorded.
    pub filled_at: DateTime<Utc>,
}

/// Order store failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct OrderStoreError(pub String);

/// Port for local order/fill persistence.
#[async_trait]
pub trait OrderStorePort: Send + Sync {
    /// Insert or update an order record by broker order id.
    async fn upsert_order(&self, record: OrderRecord) -> Result<(), OrderStoreError>;

    /// Fetch the fill record for a broker order, if one exists.
    async fn find_fill(&self, broker_order_id: &str)
        -> Result<Option<FillRecord>, OrderStoreError>;

    /// Append a fill record.
    async fn insert_fill(&self, fill: FillRecord) -> Result<(), OrderStoreError>;
}
