//! Pass-through order router.
//!
//! Forwards the intent unchanged except for one correction: a limit order
//! with no limit price and no market data falls back to a market order, the
//! same robustness-over-precision tradeoff the pipeline applies when price
//! fetch fails.

use crate::application::ports::{OrderRouterPort, RoutedOrder, Snapshot};
use crate::domain::shared::OrderType;
use crate::domain::work_queue::SubmitOrderPayload;

/// Router that forwards orders essentially unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughOrderRouter;

impl PassthroughOrderRouter {
    /// Create the router.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OrderRouterPort for PassthroughOrderRouter {
    fn transform(&self, order: &SubmitOrderPayload, prices: Option<&Snapshot>) -> RoutedOrder {
        let mut order_type = order.order_type;
        let mut limit_price = order.limit_price;
        let mut transformations = Vec::new();
        let mut warnings = Vec::new();

        if order_type == OrderType::Limit && limit_price.is_none() {
            if let Some(price) = prices.and_then(Snapshot::reference_price) {
                limit_price = Some(price);
                transformations.push(format!("limit price defaulted to reference {price}"));
            } else {
                order_type = OrderType::Market;
                limit_price = None;
                transformations.push("limit order downgraded to market: no price data".to_string());
            }
        }

        if prices.is_none() {
            warnings.push("no market data available for routing".to_string());
        }

        let extended_hours = order.extended_hours.unwrap_or(false);
        RoutedOrder {
            order_type,
            time_in_force: order.time_in_force,
            limit_price,
            extended_hours,
            order_class: order.order_class,
            take_profit_limit_price: order.take_profit_limit_price,
            stop_loss_stop_price: order.stop_loss_stop_price,
            session: if extended_hours {
                "extended".to_string()
            } else {
                "regular".to_string()
            },
            transformations,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{OrderSide, Symbol, TimeInForce};
    use rust_decimal_macros::dec;

    fn limit_buy(limit_price: Option<rust_decimal::Decimal>) -> SubmitOrderPayload {
        SubmitOrderPayload {
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            qty: Some(dec!(10)),
            notional: None,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Day,
            limit_price,
            stop_price: None,
            extended_hours: None,
            order_class: None,
            take_profit_limit_price: None,
            stop_loss_stop_price: None,
            trace_id: None,
        }
    }

    #[test]
    fn forwards_priced_limit_order() {
        let router = PassthroughOrderRouter::new();
        let routed = router.transform(&limit_buy(Some(dec!(150))), None);
        assert_eq!(routed.order_type, OrderType::Limit);
        assert_eq!(routed.limit_price, Some(dec!(150)));
        assert!(routed.transformations.is_empty());
    }

    #[test]
    fn defaults_limit_price_from_snapshot() {
        let router = PassthroughOrderRouter::new();
        let snapshot = Snapshot {
            bid: Some(dec!(99)),
            ask: Some(dec!(101)),
            last: Some(dec!(100)),
        };
        let routed = router.transform(&limit_buy(None), Some(&snapshot));
        assert_eq!(routed.order_type, OrderType::Limit);
        assert_eq!(routed.limit_price, Some(dec!(100)));
        assert_eq!(routed.transformations.len(), 1);
    }

    #[test]
    fn downgrades_unpriced_limit_to_market() {
        let router = PassthroughOrderRouter::new();
        let routed = router.transform(&limit_buy(None), None);
        assert_eq!(routed.order_type, OrderType::Market);
        assert!(routed.limit_price.is_none());
        assert!(!routed.warnings.is_empty());
    }

    #[test]
    fn session_reflects_extended_hours() {
        let router = PassthroughOrderRouter::new();
        let mut order = limit_buy(Some(dec!(150)));
        order.extended_hours = Some(true);
        let routed = router.transform(&order, None);
        assert!(routed.extended_hours);
        assert_eq!(routed.session, "extended");
    }
}
