//! Decision engine adapters.

use async_trait::async_trait;

use crate::application::ports::{DecisionError, DecisionPort};

/// No-op decision engine: acknowledges the delegation without acting.
///
/// The real decision engine is an external collaborator; this adapter keeps
/// EVALUATE_DECISION jobs flowing in wiring that has none attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDecisionEngine;

#[async_trait]
impl DecisionPort for NoOpDecisionEngine {
    async fn evaluate(
        &self,
        decision_id: &str,
        _trace_id: Option<&str>,
    ) -> Result<serde_json::Value, DecisionError> {
        Ok(serde_json::json!({
            "decisionId": decision_id,
            "action": "none",
        }))
    }
}
