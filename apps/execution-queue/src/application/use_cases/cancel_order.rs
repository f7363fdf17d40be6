//! Cancel Order Use Case

use std::sync::Arc;

use super::{HandlerError, JobSuccess};
use crate::application::ports::{BrokerError, BrokerGatewayPort};

/// Use case for canceling a broker order.
pub struct CancelOrderUseCase<G>
where
    G: BrokerGatewayPort,
{
    gateway: Arc<G>,
}

impl<G> CancelOrderUseCase<G>
where
    G: BrokerGatewayPort,
{
    /// Create a new CancelOrderUseCase.
    pub const fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Cancel the given broker order.
    pub async fn execute(&self, order_id: &str) -> Result<JobSuccess, HandlerError> {
        if order_id.trim().is_empty() {
            return Err(HandlerError::Rejected(
                "cancel order requires order_id".to_string(),
            ));
        }

        match self.gateway.cancel_order(order_id).await {
            Ok(()) => {
                tracing::info!(order_id = %order_id, "Order canceled");
                Ok(JobSuccess::of(serde_json::json!({ "canceled": order_id })))
            }
            // A missing order cannot be canceled by retrying.
            Err(BrokerError::OrderNotFound { order_id }) => Err(HandlerError::Rejected(format!(
                "order not found: {order_id}"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
