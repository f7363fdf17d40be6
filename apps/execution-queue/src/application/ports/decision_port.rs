//! Decision Engine Port (Driven Port)
//!
//! The LLM-based decision engine is an external collaborator; the queue only
//! delegates EVALUATE_DECISION jobs to it and records the returned verdict.

use async_trait::async_trait;

/// Decision engine failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DecisionError(pub String);

/// Port for the decision engine.
#[async_trait]
pub trait DecisionPort: Send + Sync {
    /// Evaluate a decision record; the returned JSON is stored as the job
    /// result.
    async fn evaluate(
        &self,
        decision_id: &str,
        trace_id: Option<&str>,
    ) -> Result<serde_json::Value, DecisionError>;
}
