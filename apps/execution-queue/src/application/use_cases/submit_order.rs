//! Submit Order Use Case
//!
//! The validation/transformation pipeline run once per claim of a
//! SUBMIT_ORDER item. The pipeline is safe to run multiple times for the same
//! idempotency key: the first attempt reuses the key as the client order id
//! (resubmission is a no-op at the broker), and every later attempt checks
//! the broker for an order that an earlier attempt may have created before
//! the process died.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{HandlerError, JobSuccess};
use crate::application::ports::{
    AgentStatusPort, AssetClass, BrokerGatewayPort, EnforcementPort, NewOrderRequest, OrderRecord,
    OrderRouterPort, OrderScope, OrderStorePort, RoutedOrder, Snapshot, TradabilityPort,
};
use crate::domain::shared::Symbol;
use crate::domain::work_queue::{SubmitOrderPayload, WorkItem};

/// How many recent broker orders to scan for a duplicate client order id.
const DUPLICATE_SCAN_LIMIT: usize = 100;

/// Use case for submitting an order through the full pipeline.
pub struct SubmitOrderUseCase<G, E, T, R, S, O>
where
    G: BrokerGatewayPort,
    E: EnforcementPort,
    T: TradabilityPort,
    R: OrderRouterPort,
    S: AgentStatusPort,
    O: OrderStorePort,
{
    gateway: Arc<G>,
    enforcement: Arc<E>,
    tradability: Arc<T>,
    router: Arc<R>,
    status: Arc<S>,
    orders: Arc<O>,
}

impl<G, E, T, R, S, O> SubmitOrderUseCase<G, E, T, R, S, O>
where
    G: BrokerGatewayPort,
    E: EnforcementPort,
    T: TradabilityPort,
    R: OrderRouterPort,
    S: AgentStatusPort,
    O: OrderStorePort,
{
    /// Create a new SubmitOrderUseCase.
    pub const fn new(
        gateway: Arc<G>,
        enforcement: Arc<E>,
        tradability: Arc<T>,
        router: Arc<R>,
        status: Arc<S>,
        orders: Arc<O>,
    ) -> Self {
        Self {
            gateway,
            enforcement,
            tradability,
            router,
            status,
            orders,
        }
    }

    /// Execute the pipeline for one claim of a SUBMIT_ORDER item.
    pub async fn execute(
        &self,
        item: &WorkItem,
        order: &SubmitOrderPayload,
    ) -> Result<JobSuccess, HandlerError> {
        let symbol = &order.symbol;

        // 1. Kill-switch gate. The producer already checked, but this is the
        //    last line of defense if it raced past an earlier check.
        let status = self.status.get_status().await?;
        if status.kill_switch_active {
            tracing::warn!(
                symbol = %symbol,
                side = %order.side,
                "Order blocked: kill switch active"
            );
            return Err(HandlerError::Rejected(
                "kill switch active: order submission blocked".to_string(),
            ));
        }

        // 2. Eligibility gate. Sells are always permitted so existing
        //    positions can be closed.
        if !order.side.is_sell() {
            let decision = self
                .enforcement
                .can_trade_symbol(symbol, order.trace_id.as_deref())
                .await?;
            if !decision.eligible {
                let reason = decision.reason.unwrap_or_else(|| "not approved".to_string());
                tracing::warn!(
                    symbol = %symbol,
                    side = %order.side,
                    reason = %reason,
                    "Order blocked: symbol not approved for trading"
                );
                return Err(HandlerError::Rejected(format!(
                    "symbol {symbol} not approved: {reason}"
                )));
            }
        }

        // 3. Tradability gate.
        let tradable = self.tradability.validate_symbol_tradable(symbol).await?;
        if !tradable.tradable {
            let reason = tradable.reason.unwrap_or_else(|| "not tradable".to_string());
            tracing::warn!(
                symbol = %symbol,
                side = %order.side,
                reason = %reason,
                "Order blocked: symbol not tradable"
            );
            return Err(HandlerError::Rejected(format!(
                "symbol {symbol} not tradable: {reason}"
            )));
        }

        // 4. Best-effort price fetch; on failure the router falls back to a
        //    market order rather than failing the job.
        let snapshot = self.fetch_snapshot(symbol).await;

        // 5. Smart order router transform.
        let routed = self.router.transform(order, snapshot.as_ref());
        for applied in &routed.transformations {
            tracing::info!(
                symbol = %symbol,
                side = %order.side,
                transformation = %applied,
                "Order transformed by router"
            );
        }

        // 6. Client order id derivation. The first attempt reuses the
        //    idempotency key (or job id) so it is naturally idempotent at the
        //    broker; a genuine retry gets a distinguishable id.
        let base = item
            .idempotency_key
            .clone()
            .unwrap_or_else(|| item.id.to_string());
        let client_order_id = if item.attempts == 0 {
            base.clone()
        } else {
            format!("{base}-r{}", item.attempts)
        };

        // 7. Broker-side duplicate check: a previous attempt may have reached
        //    the broker even though the outcome was never recorded locally.
        if let Some((existing_id, existing_status)) =
            self.find_existing_order(&base, &client_order_id).await?
        {
            tracing::info!(
                symbol = %symbol,
                client_order_id = %client_order_id,
                broker_order_id = %existing_id,
                "Broker order already exists for this client order id; treating as succeeded"
            );
            return Ok(JobSuccess::with_order(
                serde_json::json!({
                    "orderId": existing_id.clone(),
                    "status": existing_status,
                    "deduplicated": true,
                }),
                existing_id,
            ));
        }

        // 8. Sell-side quantity validation and clamp.
        let qty = if order.side.is_sell() {
            Some(self.validate_sell_qty(symbol, order, &routed).await?)
        } else {
            order.qty
        };

        // 9. Buy-side notional validation: extended-hours venues require
        //    whole-share buys.
        if !order.side.is_sell() && routed.extended_hours {
            Self::validate_buy_notional(symbol, order, snapshot.as_ref())?;
        }

        // 10. Submit.
        let request = NewOrderRequest {
            client_order_id: client_order_id.clone(),
            symbol: symbol.clone(),
            side: order.side,
            qty,
            notional: if qty.is_some() { None } else { order.notional },
            order_type: routed.order_type,
            time_in_force: routed.time_in_force,
            limit_price: routed.limit_price,
            stop_price: order.stop_price,
            extended_hours: routed.extended_hours,
            order_class: routed.order_class,
            take_profit_limit_price: routed.take_profit_limit_price,
            stop_loss_stop_price: routed.stop_loss_stop_price,
        };

        let submitted = self.gateway.create_order(request).await?;

        if let Err(e) = self
            .orders
            .upsert_order(OrderRecord::from_broker(&submitted))
            .await
        {
            // The broker order exists; losing the local record is recoverable
            // by SYNC_ORDERS, so the job still succeeds.
            tracing::error!(
                broker_order_id = %submitted.id,
                error = %e,
                "Failed to persist order record after submission"
            );
        }

        tracing::info!(
            symbol = %symbol,
            side = %order.side,
            qty = ?qty,
            notional = ?order.notional,
            broker_order_id = %submitted.id,
            client_order_id = %client_order_id,
            status = %submitted.status,
            "Order submitted"
        );

        Ok(JobSuccess::with_order(
            serde_json::json!({
                "orderId": submitted.id.clone(),
                "status": submitted.status,
            }),
            submitted.id,
        ))
    }

    /// Best-effort snapshot fetch; equities and crypto use different data
    /// paths.
    async fn fetch_snapshot(&self, symbol: &Symbol) -> Option<Snapshot> {
        let asset_class = AssetClass::of(symbol);
        match self
            .gateway
            .get_snapshots(std::slice::from_ref(symbol), asset_class)
            .await
        {
            Ok(snapshots) => snapshots.get(symbol.as_str()).copied(),
            Err(e) => {
                tracing::warn!(
                    symbol = %symbol,
                    error = %e,
                    "Snapshot fetch failed; falling back to market order pricing"
                );
                None
            }
        }
    }

    /// Scan recent open and closed broker orders for one created by an
    /// earlier attempt of this item.
    ///
    /// A match is the exact derived id, the base id (an earlier attempt), or
    /// the base with a retry suffix.
    async fn find_existing_order(
        &self,
        base: &str,
        derived: &str,
    ) -> Result<Option<(String, String)>, HandlerError> {
        let retry_prefix = format!("{base}-r");
        for scope in [OrderScope::Open, OrderScope::Closed] {
            let orders = self.gateway.get_orders(scope, DUPLICATE_SCAN_LIMIT).await?;
            if let Some(found) = orders.into_iter().find(|o| {
                o.client_order_id == derived
                    || o.client_order_id == base
                    || o.client_order_id.starts_with(&retry_prefix)
            }) {
                return Ok(Some((found.id, found.status)));
            }
        }
        Ok(None)
    }

    /// Fetch the live position and clamp the requested sell quantity to what
    /// is actually available.
    async fn validate_sell_qty(
        &self,
        symbol: &Symbol,
        order: &SubmitOrderPayload,
        routed: &RoutedOrder,
    ) -> Result<Decimal, HandlerError> {
        let positions = self.gateway.get_positions().await?;
        let available = positions
            .iter()
            .find(|p| &p.symbol == symbol)
            .map(|p| p.qty_available)
            .unwrap_or(Decimal::ZERO);

        if available <= Decimal::ZERO {
            tracing::warn!(
                symbol = %symbol,
                requested_qty = ?order.qty,
                "Sell blocked: no position quantity available"
            );
            return Err(HandlerError::Rejected(format!(
                "no position available to sell for {symbol}"
            )));
        }

        let requested = order.qty.unwrap_or(available);
        let mut qty = requested.min(available);
        if qty < requested {
            tracing::warn!(
                symbol = %symbol,
                requested_qty = %requested,
                available_qty = %available,
                "Sell quantity clamped to available position"
            );
        }

        // Fractional shares are not eligible for extended-hours trading.
        if routed.extended_hours {
            qty = qty.floor();
            if qty <= Decimal::ZERO {
                tracing::warn!(
                    symbol = %symbol,
                    available_qty = %available,
                    "Sell blocked: position floors to zero whole shares for extended hours"
                );
                return Err(HandlerError::Rejected(format!(
                    "position in {symbol} is below one whole share; not sellable in extended hours"
                )));
            }
        }

        Ok(qty)
    }

    /// Extended-hours buys must amount to at least one whole share at the
    /// current price.
    fn validate_buy_notional(
        symbol: &Symbol,
        order: &SubmitOrderPayload,
        snapshot: Option<&Snapshot>,
    ) -> Result<(), HandlerError> {
        let Some(notional) = order.notional else {
            return Ok(());
        };
        let Some(price) = snapshot.and_then(Snapshot::reference_price) else {
            // Price unknown: the check is best-effort like the fetch itself.
            return Ok(());
        };
        if price > Decimal::ZERO && notional / price < Decimal::ONE {
            tracing::warn!(
                symbol = %symbol,
                notional = %notional,
                price = %price,
                "Buy blocked: notional below one whole share for extended hours"
            );
            return Err(HandlerError::Rejected(format!(
                "notional {notional} buys less than one share of {symbol} at {price}; \
                 extended hours requires whole shares"
            )));
        }
        Ok(())
    }
}
