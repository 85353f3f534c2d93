//! Exponential backoff after failures, bounded jitter after successes

use std::time::Duration;

use rand::Rng;

use crate::types::RunState;

/// Largest multiple of the base delay that a failure streak can reach.
pub const DEFAULT_CAP_MULTIPLIER: u32 = 16;

/// Upper bound on the jitter added after a success (in milliseconds).
pub const DEFAULT_MAX_JITTER_MS: u64 = 1_000;

const JITTER_DIVISOR: u64 = 5;

/// Computes how long to wait before the next attempt.
///
/// # Formula
/// - after `n >= 1` consecutive failures: `base * min(2^(n - 1), cap)`
/// - after a success: `base + uniform(0, min(max_jitter, base / 5))`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Base delay between attempts (in milliseconds)
    pub base_delay_ms: u64,

    /// Cap on the backoff multiplier
    ///
    /// Default: 16
    pub cap_multiplier: u32,

    /// Cap on the post-success jitter (in milliseconds)
    ///
    /// Default: 1000
    pub max_jitter_ms: u64,
}

impl BackoffPolicy {
    /// Create a policy with the default caps.
    #[must_use]
    pub const fn new(base_delay: Duration) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "delays beyond u64 milliseconds are not meaningful"
        )]
        let base_delay_ms = base_delay.as_millis() as u64;

        Self {
            base_delay_ms,
            cap_multiplier: DEFAULT_CAP_MULTIPLIER,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
        }
    }

    /// Backoff multiplier for a streak of `consecutive_errors` failures.
    ///
    /// Returns 1 for a streak of zero so callers never wait less than the
    /// base delay.
    #[must_use]
    pub const fn multiplier(&self, consecutive_errors: u32) -> u32 {
        let exponent = consecutive_errors.saturating_sub(1);

        // 2^32 would overflow, and any such streak is far past the cap anyway
        let multiplier = if exponent >= u32::BITS {
            u32::MAX
        } else {
            1u32 << exponent
        };

        if multiplier < self.cap_multiplier {
            multiplier
        } else {
            self.cap_multiplier
        }
    }

    /// Wait after the `consecutive_errors`-th failure in a row.
    #[must_use]
    pub fn after_failure(&self, consecutive_errors: u32) -> Duration {
        Duration::from_millis(
            self.base_delay_ms
                .saturating_mul(u64::from(self.multiplier(consecutive_errors))),
        )
    }

    /// Largest jitter that may be added after a success (in milliseconds).
    #[must_use]
    pub const fn jitter_ceiling_ms(&self) -> u64 {
        let fifth = self.base_delay_ms / JITTER_DIVISOR;

        if fifth < self.max_jitter_ms {
            fifth
        } else {
            self.max_jitter_ms
        }
    }

    /// Wait after a success: the base delay plus a random jitter.
    pub fn after_success<R: Rng>(&self, rng: &mut R) -> Duration {
        let jitter = rng.random_range(0..=self.jitter_ceiling_ms());
        Duration::from_millis(self.base_delay_ms.saturating_add(jitter))
    }

    /// Wait appropriate for the state left by the attempt that just finished.
    pub fn next_wait<R: Rng>(&self, state: &RunState, rng: &mut R) -> Duration {
        if state.consecutive_errors == 0 {
            self.after_success(rng)
        } else {
            self.after_failure(state.consecutive_errors)
        }
    }
}
