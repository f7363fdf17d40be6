//! Evaluate Decision Use Case

use std::sync::Arc;

use super::{HandlerError, JobSuccess};
use crate::application::ports::DecisionPort;

/// Use case delegating a trading decision to the external decision engine.
pub struct EvaluateDecisionUseCase<D>
where
    D: DecisionPort,
{
    decisions: Arc<D>,
}

impl<D> EvaluateDecisionUseCase<D>
where
    D: DecisionPort,
{
    /// Create a new EvaluateDecisionUseCase.
    pub const fn new(decisions: Arc<D>) -> Self {
        Self { decisions }
    }

    /// Evaluate one decision record.
    pub async fn execute(
        &self,
        decision_id: &str,
        trace_id: Option<&str>,
    ) -> Result<JobSuccess, HandlerError> {
        let verdict = self.decisions.evaluate(decision_id, trace_id).await?;
        tracing::info!(decision_id = %decision_id, "Decision evaluated");
        Ok(JobSuccess::of(verdict))
    }
}
