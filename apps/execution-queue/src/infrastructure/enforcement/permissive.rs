//! Permissive enforcement adapter.
//!
//! Approves every symbol unless it appears on the configured blocklist.
//! Useful for paper wiring and tests; the production collaborators live
//! outside this subsystem.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::ports::{
    EligibilityDecision, EnforcementError, EnforcementPort, TradabilityDecision, TradabilityPort,
    UniverseSyncReport,
};
use crate::domain::shared::Symbol;

/// Enforcement and tradability adapter that approves everything not
/// explicitly blocked.
#[derive(Debug, Default)]
pub struct PermissiveEnforcement {
    blocked: RwLock<HashSet<String>>,
}

impl PermissiveEnforcement {
    /// Create an adapter with an empty blocklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a symbol.
    pub fn block(&self, symbol: &str) {
        if let Ok(mut blocked) = self.blocked.write() {
            blocked.insert(Symbol::new(symbol).into_inner());
        }
    }

    fn is_blocked(&self, symbol: &Symbol) -> bool {
        self.blocked
            .read()
            .map(|blocked| blocked.contains(symbol.as_str()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl EnforcementPort for PermissiveEnforcement {
    async fn can_trade_symbol(
        &self,
        symbol: &Symbol,
        _trace_id: Option<&str>,
    ) -> Result<EligibilityDecision, EnforcementError> {
        if self.is_blocked(symbol) {
            return Ok(EligibilityDecision {
                eligible: false,
                reason: Some(format!("{symbol} is blocklisted")),
            });
        }
        Ok(EligibilityDecision {
            eligible: true,
            reason: None,
        })
    }

    async fn sync_universe(
        &self,
        _asset_class: Option<&str>,
    ) -> Result<UniverseSyncReport, EnforcementError> {
        Ok(UniverseSyncReport::default())
    }
}

#[async_trait]
impl TradabilityPort for PermissiveEnforcement {
    async fn validate_symbol_tradable(
        &self,
        symbol: &Symbol,
    ) -> Result<TradabilityDecision, EnforcementError> {
        if self.is_blocked(symbol) {
            return Ok(TradabilityDecision {
                tradable: false,
                reason: Some(format!("{symbol} is blocklisted")),
            });
        }
        Ok(TradabilityDecision {
            tradable: true,
            reason: None,
        })
    }
}
