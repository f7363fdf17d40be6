//! Declarative error classification.
//!
//! The classifier is an ordered `(pattern, class)` table rather than code, so
//! it stays testable as a pure data-to-enum mapping. First match wins;
//! permanent patterns are listed before the transient ones because broker
//! rejection messages often also mention the transport ("request failed").

use regex::Regex;
use std::sync::LazyLock;

/// Classification of a failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retrying cannot help (domain rejection, validation, auth).
    Permanent,
    /// Infrastructure hiccup; retrying per the backoff table is expected to
    /// succeed.
    Transient,
    /// Matched neither column; treated as retryable, bounded by the attempt
    /// ceiling.
    Unknown,
}

impl ErrorClass {
    /// Whether a failure of this class should be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent)
    }
}

/// Ordered pattern table. Patterns are matched case-insensitively against the
/// failure message; the first hit decides.
static PATTERNS: LazyLock<Vec<(Regex, ErrorClass)>> = LazyLock::new(|| {
    const TABLE: &[(&str, ErrorClass)] = &[
        // Permanent: domain rejections and client errors.
        (r"invalid symbol", ErrorClass::Permanent),
        (r"symbol not found", ErrorClass::Permanent),
        (r"insufficient (buying power|funds|balance)", ErrorClass::Permanent),
        (r"account (is )?(blocked|restricted)", ErrorClass::Permanent),
        (r"not tradable", ErrorClass::Permanent),
        (r"asset .* (is not|not) active", ErrorClass::Permanent),
        (r"invalid (qty|quantity|order)", ErrorClass::Permanent),
        (r"(order )?rejected", ErrorClass::Permanent),
        (r"forbidden|unauthorized|unprocessable", ErrorClass::Permanent),
        // Transient network failures outrank the status-code rules so that a
        // "request timed out (408)" style message stays retryable.
        (r"timed? ?out", ErrorClass::Transient),
        (r"connection (reset|refused|closed)", ErrorClass::Transient),
        (r"broken pipe|socket|dns", ErrorClass::Transient),
        // 429 is transient; it must outrank the generic 4xx rule below.
        (r"\b429\b|rate limit|too many requests", ErrorClass::Transient),
        (r"\b4[0-9]{2}\b", ErrorClass::Permanent),
        (r"\b5[0-9]{2}\b", ErrorClass::Transient),
        (r"temporar(y|ily)|unavailable|try again", ErrorClass::Transient),
        (r"network", ErrorClass::Transient),
    ];

    TABLE
        .iter()
        .map(|(pattern, class)| {
            #[allow(clippy::expect_used)] // table patterns are compile-time constants
            let re = Regex::new(&format!("(?i){pattern}")).expect("static classifier pattern");
            (re, *class)
        })
        .collect()
});

/// Classify a failure message.
///
/// Returns `Unknown` (retryable) when no pattern matches: failing safe toward
/// retry is bounded by `max_attempts`, while failing toward dead-letter would
/// drop work on any unrecognized message.
#[must_use]
pub fn classify(message: &str) -> ErrorClass {
    for (pattern, class) in PATTERNS.iter() {
        if pattern.is_match(message) {
            return *class;
        }
    }
    ErrorClass::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("invalid symbol: AAAPL", ErrorClass::Permanent; "invalid symbol")]
    #[test_case("insufficient buying power", ErrorClass::Permanent; "buying power")]
    #[test_case("account is blocked", ErrorClass::Permanent; "blocked account")]
    #[test_case("asset BTC/USD is not active", ErrorClass::Permanent; "inactive asset")]
    #[test_case("symbol XYZ not tradable", ErrorClass::Permanent; "not tradable")]
    #[test_case("invalid qty: 0", ErrorClass::Permanent; "invalid quantity")]
    #[test_case("order rejected by venue", ErrorClass::Permanent; "explicit rejection")]
    #[test_case("HTTP 403 forbidden", ErrorClass::Permanent; "http 403")]
    #[test_case("request failed with status 422", ErrorClass::Permanent; "http 422")]
    fn permanent_patterns(message: &str, expected: ErrorClass) {
        assert_eq!(classify(message), expected);
    }

    #[test_case("request timed out after 30s"; "timeout")]
    #[test_case("connection reset by peer"; "reset")]
    #[test_case("HTTP 429 too many requests"; "rate limit")]
    #[test_case("server returned 503"; "http 503")]
    #[test_case("service temporarily unavailable"; "temporary")]
    #[test_case("network is unreachable"; "network")]
    fn transient_patterns(message: &str) {
        assert_eq!(classify(message), ErrorClass::Transient);
    }

    #[test]
    fn rate_limit_outranks_generic_4xx() {
        assert_eq!(classify("status 429"), ErrorClass::Transient);
        assert_eq!(classify("status 404"), ErrorClass::Permanent);
    }

    #[test]
    fn unmatched_is_unknown_and_retryable() {
        let class = classify("wat");
        assert_eq!(class, ErrorClass::Unknown);
        assert!(class.is_retryable());
    }

    #[test]
    fn permanent_is_not_retryable() {
        assert!(!ErrorClass::Permanent.is_retryable());
        assert!(ErrorClass::Transient.is_retryable());
    }
}
