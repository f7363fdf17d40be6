//! Kill Switch Use Case
//!
//! Cancels all broker orders, optionally flattens all positions (continuing
//! past individual close failures), and persists the global kill-switch flag
//! that the submission pipeline's first gate reads.

use std::sync::Arc;

use chrono::Utc;

use super::{HandlerError, JobSuccess};
use crate::application::ports::{AgentStatus, AgentStatusPort, BrokerGatewayPort};

/// Use case for the emergency kill switch.
pub struct KillSwitchUseCase<G, S>
where
    G: BrokerGatewayPort,
    S: AgentStatusPort,
{
    gateway: Arc<G>,
    status: Arc<S>,
}

impl<G, S> KillSwitchUseCase<G, S>
where
    G: BrokerGatewayPort,
    S: AgentStatusPort,
{
    /// Create a new KillSwitchUseCase.
    pub const fn new(gateway: Arc<G>, status: Arc<S>) -> Self {
        Self { gateway, status }
    }

    /// Execute the kill switch.
    pub async fn execute(&self, close_positions: bool) -> Result<JobSuccess, HandlerError> {
        tracing::warn!(close_positions, "Kill switch engaged");

        let canceled = self.gateway.cancel_all_orders().await?;

        let mut closed = 0usize;
        let mut close_errors = 0usize;
        if close_positions {
            let positions = self.gateway.get_positions().await?;
            for position in positions {
                match self.gateway.close_position(&position.symbol).await {
                    Ok(order) => {
                        closed += 1;
                        tracing::info!(
                            symbol = %position.symbol,
                            qty = %position.qty,
                            broker_order_id = %order.id,
                            "Position flattened by kill switch"
                        );
                    }
                    Err(e) => {
                        close_errors += 1;
                        tracing::error!(
                            symbol = %position.symbol,
                            error = %e,
                            "Position close failed; continuing"
                        );
                    }
                }
            }
        }

        self.status
            .set_status(AgentStatus::engaged("kill switch job", Utc::now()))
            .await?;

        tracing::warn!(canceled, closed, close_errors, "Kill switch complete");

        Ok(JobSuccess::of(serde_json::json!({
            "canceledOrders": canceled,
            "closedPositions": closed,
            "closeErrors": close_errors,
        })))
    }
}
