//! Per-job-type backoff schedule with jitter.

use rand::Rng;
use std::time::Duration;

use crate::domain::work_queue::JobKind;

/// Delay tables in milliseconds, indexed by attempt count and capped at the
/// last entry.
const SUBMIT_ORDER_DELAYS_MS: &[u64] = &[1_000, 5_000, 15_000];
/// Kill switch retries fast: it is a safety action.
const KILL_SWITCH_DELAYS_MS: &[u64] = &[500, 2_000, 5_000];
/// Universe sync is slow and low-urgency.
const UNIVERSE_SYNC_DELAYS_MS: &[u64] = &[60_000, 300_000, 600_000];
/// Job types without an explicit table.
const DEFAULT_DELAYS_MS: &[u64] = &[5_000, 15_000, 60_000];

/// Jitter fraction added on top of the base delay.
const JITTER_FACTOR: f64 = 0.2;

/// Maps (job type, attempt count) to a retry delay with jitter.
///
/// Jitter prevents thundering-herd retries when many items fail together,
/// e.g. during a broker outage.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffPolicy;

impl BackoffPolicy {
    /// Create the standard policy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Base delay without jitter: `table[min(attempts, len - 1)]`.
    #[must_use]
    pub fn base_delay(&self, kind: JobKind, attempts: u32) -> Duration {
        let table = Self::table_for(kind);
        let index = (attempts as usize).min(table.len() - 1);
        Duration::from_millis(table[index])
    }

    /// Delay with jitter: base plus a uniform random 0–20% of the base.
    #[must_use]
    pub fn delay(&self, kind: JobKind, attempts: u32) -> Duration {
        let base = self.base_delay(kind, attempts);
        let jitter_ms = rand::rng().random_range(0.0..=base.as_millis() as f64 * JITTER_FACTOR);
        base + Duration::from_millis(jitter_ms as u64)
    }

    const fn table_for(kind: JobKind) -> &'static [u64] {
        match kind {
            JobKind::SubmitOrder => SUBMIT_ORDER_DELAYS_MS,
            JobKind::KillSwitch => KILL_SWITCH_DELAYS_MS,
            JobKind::SyncAssetUniverse => UNIVERSE_SYNC_DELAYS_MS,
            JobKind::CancelOrder
            | JobKind::SyncOrders
            | JobKind::ClosePosition
            | JobKind::EvaluateDecision => DEFAULT_DELAYS_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_order_schedule() {
        let policy = BackoffPolicy::new();
        assert_eq!(
            policy.base_delay(JobKind::SubmitOrder, 0),
            Duration::from_secs(1)
        );
        assert_eq!(
            policy.base_delay(JobKind::SubmitOrder, 1),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.base_delay(JobKind::SubmitOrder, 2),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn delay_caps_at_last_entry() {
        let policy = BackoffPolicy::new();
        for attempts in 3..10 {
            assert_eq!(
                policy.base_delay(JobKind::SubmitOrder, attempts),
                Duration::from_secs(15)
            );
        }
    }

    #[test]
    fn base_delay_is_monotonic_per_kind() {
        let policy = BackoffPolicy::new();
        for kind in [
            JobKind::SubmitOrder,
            JobKind::KillSwitch,
            JobKind::SyncAssetUniverse,
            JobKind::CancelOrder,
        ] {
            for n in 0..5 {
                assert!(policy.base_delay(kind, n + 1) >= policy.base_delay(kind, n));
            }
        }
    }

    #[test]
    fn kill_switch_retries_faster_than_default() {
        let policy = BackoffPolicy::new();
        assert!(
            policy.base_delay(JobKind::KillSwitch, 0) < policy.base_delay(JobKind::SyncOrders, 0)
        );
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let policy = BackoffPolicy::new();
        for _ in 0..100 {
            let base = policy.base_delay(JobKind::SubmitOrder, 0);
            let jittered = policy.delay(JobKind::SubmitOrder, 0);
            assert!(jittered >= base);
            assert!(jittered <= base + Duration::from_millis(200));
        }
    }

    #[test]
    fn unlisted_kinds_use_default_table() {
        let policy = BackoffPolicy::new();
        assert_eq!(
            policy.base_delay(JobKind::EvaluateDecision, 0),
            Duration::from_secs(5)
        );
    }
}
