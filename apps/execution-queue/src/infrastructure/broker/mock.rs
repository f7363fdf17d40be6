//! Mock broker gateway for testing and paper wiring.
//!
//! Returns simulated responses without making API calls. Order ids are
//! generated sequentially starting from 1; positions, snapshots, pre-existing
//! orders, and scripted failures can be seeded for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::application::ports::{
    AssetClass, BrokerError, BrokerGatewayPort, BrokerOrder, NewOrderRequest, OrderScope, Position,
    Snapshot,
};
use crate::domain::shared::Symbol;

/// Broker statuses that count as open.
const OPEN_STATUSES: &[&str] = &["new", "accepted", "partially_filled", "pending_new"];

#[derive(Debug, Default)]
struct MockState {
    orders: Vec<BrokerOrder>,
    positions: Vec<Position>,
    snapshots: HashMap<String, Snapshot>,
    fail_next_create: Option<BrokerError>,
    create_calls: u64,
}

/// Mock broker gateway.
#[derive(Debug, Default)]
pub struct MockBrokerGateway {
    order_counter: AtomicU64,
    state: Mutex<MockState>,
}

impl MockBrokerGateway {
    /// Create a new mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order_counter: AtomicU64::new(1),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Seed an open position.
    pub fn set_position(&self, symbol: &str, qty: Decimal, qty_available: Decimal) {
        if let Ok(mut state) = self.state.lock() {
            state.positions.push(Position {
                symbol: Symbol::new(symbol),
                qty,
                qty_available,
                avg_entry_price: Decimal::ONE_HUNDRED,
            });
        }
    }

    /// Seed a price snapshot.
    pub fn set_snapshot(&self, symbol: &str, bid: Decimal, ask: Decimal, last: Decimal) {
        if let Ok(mut state) = self.state.lock() {
            state.snapshots.insert(
                Symbol::new(symbol).into_inner(),
                Snapshot {
                    bid: Some(bid),
                    ask: Some(ask),
                    last: Some(last),
                },
            );
        }
    }

    /// Seed a pre-existing broker order (e.g. from a crashed earlier attempt).
    pub fn push_order(&self, order: BrokerOrder) {
        if let Ok(mut state) = self.state.lock() {
            state.orders.push(order);
        }
    }

    /// Fail the next `create_order` call with the given error.
    pub fn fail_next_create(&self, error: BrokerError) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next_create = Some(error);
        }
    }

    /// Number of `create_order` calls made (including failed ones).
    pub fn create_order_calls(&self) -> u64 {
        self.state.lock().map(|s| s.create_calls).unwrap_or(0)
    }

    /// Convenience constructor for a canned accepted order.
    #[must_use]
    pub fn accepted_order(id: &str, client_order_id: &str, symbol: &str) -> BrokerOrder {
        BrokerOrder {
            id: id.to_string(),
            client_order_id: client_order_id.to_string(),
            symbol: Symbol::new(symbol),
            side: crate::domain::shared::OrderSide::Buy,
            qty: None,
            status: "accepted".to_string(),
            filled_qty: Decimal::ZERO,
            filled_avg_price: None,
            submitted_at: Utc::now(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>, BrokerError> {
        self.state.lock().map_err(|_| BrokerError::Api {
            message: "mock state lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl BrokerGatewayPort for MockBrokerGateway {
    async fn create_order(&self, request: NewOrderRequest) -> Result<BrokerOrder, BrokerError> {
        let mut state = self.lock()?;
        state.create_calls += 1;

        if let Some(error) = state.fail_next_create.take() {
            return Err(error);
        }

        let id = self.order_counter.fetch_add(1, Ordering::SeqCst);
        let order = BrokerOrder {
            id: format!("o{id}"),
            client_order_id: request.client_order_id,
            symbol: request.symbol,
            side: request.side,
            qty: request.qty,
            status: "accepted".to_string(),
            filled_qty: Decimal::ZERO,
            filled_avg_price: None,
            submitted_at: Utc::now(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let mut state = self.lock()?;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        order.status = "canceled".to_string();
        Ok(())
    }

    async fn cancel_all_orders(&self) -> Result<usize, BrokerError> {
        let mut state = self.lock()?;
        let mut canceled = 0;
        for order in &mut state.orders {
            if OPEN_STATUSES.contains(&order.status.as_str()) {
                order.status = "canceled".to_string();
                canceled += 1;
            }
        }
        Ok(canceled)
    }

    async fn get_orders(
        &self,
        scope: OrderScope,
        limit: usize,
    ) -> Result<Vec<BrokerOrder>, BrokerError> {
        let state = self.lock()?;
        let mut orders: Vec<BrokerOrder> = state
            .orders
            .iter()
            .filter(|o| {
                let open = OPEN_STATUSES.contains(&o.status.as_str());
                match scope {
                    OrderScope::Open => open,
                    OrderScope::Closed => !open,
                }
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        orders.truncate(limit);
        Ok(orders)
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.lock()?.positions.clone())
    }

    async fn close_position(&self, symbol: &Symbol) -> Result<BrokerOrder, BrokerError> {
        let mut state = self.lock()?;
        let index = state
            .positions
            .iter()
            .position(|p| &p.symbol == symbol)
            .ok_or_else(|| BrokerError::PositionNotFound {
                symbol: symbol.to_string(),
            })?;
        let position = state.positions.remove(index);

        let id = self.order_counter.fetch_add(1, Ordering::SeqCst);
        let order = BrokerOrder {
            id: format!("o{id}"),
            client_order_id: format!("close-{symbol}-{id}"),
            symbol: position.symbol,
            side: crate::domain::shared::OrderSide::Sell,
            qty: Some(position.qty),
            status: "accepted".to_string(),
            filled_qty: Decimal::ZERO,
            filled_avg_price: None,
            submitted_at: Utc::now(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn get_snapshots(
        &self,
        symbols: &[Symbol],
        _asset_class: AssetClass,
    ) -> Result<HashMap<String, Snapshot>, BrokerError> {
        let state = self.lock()?;
        Ok(symbols
            .iter()
            .filter_map(|s| {
                state
                    .snapshots
                    .get(s.as_str())
                    .map(|snapshot| (s.as_str().to_string(), *snapshot))
            })
            .collect())
    }
}
