//! Close Position Use Case

use std::sync::Arc;

use super::{HandlerError, JobSuccess};
use crate::application::ports::{BrokerError, BrokerGatewayPort};
use crate::domain::shared::Symbol;

/// Use case for closing an open position at market.
pub struct ClosePositionUseCase<G>
where
    G: BrokerGatewayPort,
{
    gateway: Arc<G>,
}

impl<G> ClosePositionUseCase<G>
where
    G: BrokerGatewayPort,
{
    /// Create a new ClosePositionUseCase.
    pub const fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Close the position for the given symbol.
    pub async fn execute(&self, symbol: &Symbol) -> Result<JobSuccess, HandlerError> {
        match self.gateway.close_position(symbol).await {
            Ok(order) => {
                tracing::info!(
                    symbol = %symbol,
                    broker_order_id = %order.id,
                    "Position close submitted"
                );
                Ok(JobSuccess::with_order(
                    serde_json::json!({
                        "orderId": order.id.clone(),
                        "status": order.status,
                    }),
                    order.id,
                ))
            }
            // Nothing to close; retrying cannot help.
            Err(BrokerError::PositionNotFound { symbol }) => Err(HandlerError::Rejected(format!(
                "no open position for {symbol}"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
