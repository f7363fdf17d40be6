//! Sync Asset Universe Use Case

use std::sync::Arc;

use super::{HandlerError, JobSuccess};
use crate::application::ports::EnforcementPort;

/// Use case delegating an asset-universe refresh to the enforcement
/// collaborator.
pub struct SyncUniverseUseCase<E>
where
    E: EnforcementPort,
{
    enforcement: Arc<E>,
}

impl<E> SyncUniverseUseCase<E>
where
    E: EnforcementPort,
{
    /// Create a new SyncUniverseUseCase.
    pub const fn new(enforcement: Arc<E>) -> Self {
        Self { enforcement }
    }

    /// Refresh the universe; any internal errors mean the job failed and
    /// should be retried.
    pub async fn execute(&self, asset_class: Option<&str>) -> Result<JobSuccess, HandlerError> {
        let report = self.enforcement.sync_universe(asset_class).await?;

        if !report.errors.is_empty() {
            tracing::warn!(
                synced = report.synced,
                error_count = report.errors.len(),
                "Universe sync reported internal errors"
            );
            return Err(HandlerError::Collaborator(format!(
                "universe sync reported {} internal errors: {}",
                report.errors.len(),
                report.errors.join("; ")
            )));
        }

        tracing::info!(synced = report.synced, "Universe sync complete");
        Ok(JobSuccess::of(serde_json::json!({
            "synced": report.synced,
        })))
    }
}
