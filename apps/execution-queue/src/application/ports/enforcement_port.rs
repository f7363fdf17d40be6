//! Trading Enforcement & Tradability Ports (Driven Ports)
//!
//! Eligibility and tradability scoring live outside this subsystem; the
//! submission pipeline only consumes their verdicts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;

/// Verdict on whether a symbol is currently approved for new buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    /// Whether the symbol is approved.
    pub eligible: bool,
    /// Block reason when not approved.
    pub reason: Option<String>,
}

/// Verdict on broker-universe membership and price-floor checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradabilityDecision {
    /// Whether the symbol is tradable at the venue.
    pub tradable: bool,
    /// Block reason when not tradable.
    pub reason: Option<String>,
}

/// Aggregate outcome of an asset-universe refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UniverseSyncReport {
    /// Symbols refreshed.
    pub synced: usize,
    /// Internal errors reported by the collaborator; a non-empty list means
    /// the refresh should be retried.
    pub errors: Vec<String>,
}

/// Enforcement collaborator failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EnforcementError(pub String);

/// Port for the trading-enforcement collaborator.
#[async_trait]
pub trait EnforcementPort: Send + Sync {
    /// Whether new orders for the symbol are currently approved.
    async fn can_trade_symbol(
        &self,
        symbol: &Symbol,
        trace_id: Option<&str>,
    ) -> Result<EligibilityDecision, EnforcementError>;

    /// Refresh the tradable asset universe.
    async fn sync_universe(
        &self,
        asset_class: Option<&str>,
    ) -> Result<UniverseSyncReport, EnforcementError>;
}

/// Port for the tradability-scoring collaborator.
#[async_trait]
pub trait TradabilityPort: Send + Sync {
    /// Validate broker-universe membership and the price floor.
    async fn validate_symbol_tradable(
        &self,
        symbol: &Symbol,
    ) -> Result<TradabilityDecision, EnforcementError>;
}
