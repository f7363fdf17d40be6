//! Agent Status / Kill-Switch Store Port (Driven Port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Global agent status, shared across the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// When true, all order submission is blocked.
    pub kill_switch_active: bool,
    /// Why the kill switch was engaged.
    pub reason: Option<String>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl AgentStatus {
    /// Status with the kill switch disengaged.
    #[must_use]
    pub fn inactive(now: DateTime<Utc>) -> Self {
        Self {
            kill_switch_active: false,
            reason: None,
            updated_at: now,
        }
    }

    /// Status with the kill switch engaged.
    #[must_use]
    pub fn engaged(reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            kill_switch_active: true,
            reason: Some(reason.into()),
            updated_at: now,
        }
    }
}

/// Status store failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StatusError(pub String);

/// Port for the agent status store.
#[async_trait]
pub trait AgentStatusPort: Send + Sync {
    /// Read the current status.
    async fn get_status(&self) -> Result<AgentStatus, StatusError>;

    /// Persist a new status.
    async fn set_status(&self, status: AgentStatus) -> Result<(), StatusError>;
}
