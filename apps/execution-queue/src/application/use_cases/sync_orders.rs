//! Sync Orders Use Case
//!
//! Pulls open and recently-closed broker orders, upserts local order records,
//! and synthesizes a fill record for any order with a non-zero filled
//! quantity that lacks one. A single order's sync error never fails the
//! batch; it is logged and counted, and the batch completes.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use super::{HandlerError, JobSuccess};
use crate::application::ports::{
    BrokerGatewayPort, BrokerOrder, FillRecord, OrderRecord, OrderScope, OrderStorePort,
};

/// How many orders to pull per scope when reconciling.
const SYNC_FETCH_LIMIT: usize = 100;

/// Use case for reconciling local order/fill records with the broker.
pub struct SyncOrdersUseCase<G, O>
where
    G: BrokerGatewayPort,
    O: OrderStorePort,
{
    gateway: Arc<G>,
    orders: Arc<O>,
}

impl<G, O> SyncOrdersUseCase<G, O>
where
    G: BrokerGatewayPort,
    O: OrderStorePort,
{
    /// Create a new SyncOrdersUseCase.
    pub const fn new(gateway: Arc<G>, orders: Arc<O>) -> Self {
        Self { gateway, orders }
    }

    /// Execute a full reconciliation pass.
    pub async fn execute(&self, trace_id: Option<&str>) -> Result<JobSuccess, HandlerError> {
        let mut broker_orders = self.gateway.get_orders(OrderScope::Open, SYNC_FETCH_LIMIT).await?;
        broker_orders.extend(
            self.gateway
                .get_orders(OrderScope::Closed, SYNC_FETCH_LIMIT)
                .await?,
        );

        let mut synced = 0usize;
        let mut fills_created = 0usize;
        let mut errors = 0usize;

        for order in &broker_orders {
            match self.sync_one(order).await {
                Ok(fill_created) => {
                    synced += 1;
                    if fill_created {
                        fills_created += 1;
                    }
                }
                Err(e) => {
                    errors += 1;
                    tracing::warn!(
                        broker_order_id = %order.id,
                        symbol = %order.symbol,
                        error = %e,
                        "Order sync failed; continuing batch"
                    );
                }
            }
        }

        tracing::info!(
            trace_id = ?trace_id,
            synced,
            fills_created,
            errors,
            "Order sync complete"
        );

        Ok(JobSuccess::of(serde_json::json!({
            "synced": synced,
            "fillsCreated": fills_created,
            "errors": errors,
        })))
    }

    /// Upsert one order record and backfill its fill record if needed.
    async fn sync_one(&self, order: &BrokerOrder) -> Result<bool, HandlerError> {
        self.orders.upsert_order(OrderRecord::from_broker(order)).await?;

        if order.filled_qty <= Decimal::ZERO {
            return Ok(false);
        }
        if self.orders.find_fill(&order.id).await?.is_some() {
            return Ok(false);
        }

        self.orders
            .insert_fill(FillRecord {
                broker_order_id: order.id.clone(),
                qty: order.filled_qty,
                price: order.filled_avg_price.unwrap_or(Decimal::ZERO),
                filled_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            broker_order_id = %order.id,
            symbol = %order.symbol,
            filled_qty = %order.filled_qty,
            "Synthesized missing fill record"
        );
        Ok(true)
    }
}
