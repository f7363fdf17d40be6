//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading symbol (equity ticker or crypto pair).
///
/// Examples:
/// - Equity: "AAPL", "MSFT", "GOOGL"
/// - Crypto: "BTC/USD", "ETH/USD" (slash-separated pair form)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// The symbol is normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Check if this is a crypto pair symbol.
    ///
    /// Crypto symbols use the slash-separated pair form ("BTC/USD"); equities
    /// never contain a slash.
    #[must_use]
    pub fn is_crypto(&self) -> bool {
        self.0.contains('/')
    }

    /// Check if this is an equity symbol.
    #[must_use]
    pub fn is_equity(&self) -> bool {
        !self.is_crypto()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_normalizes_to_uppercase() {
        assert_eq!(Symbol::new("aapl").as_str(), "AAPL");
    }

    #[test]
    fn symbol_crypto_detection() {
        assert!(Symbol::new("BTC/USD").is_crypto());
        assert!(!Symbol::new("AAPL").is_crypto());
        assert!(Symbol::new("AAPL").is_equity());
    }

    #[test]
    fn symbol_serde_transparent() {
        let json = serde_json::to_string(&Symbol::new("MSFT")).unwrap();
        assert_eq!(json, "\"MSFT\"");
    }
}
