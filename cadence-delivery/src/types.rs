//! Type definitions shared by the executor and the scheduler

use std::fmt::{self, Display, Formatter};

use crate::config::Identity;

/// Identifier the transport reports for an accepted message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryId(pub String);

impl Display for DeliveryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully composed message, ready to hand to a [`crate::MailTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// `Message-ID` header value, including the angle brackets
    pub message_id: String,
    pub from: Identity,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Outcome of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Success { delivery_id: DeliveryId },
    Failure { diagnostic: String },
}

impl AttemptResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Counters owned by the scheduler for the lifetime of one run
///
/// The `running` flag lives in the scheduler's [`crate::StopHandle`] since it
/// is the one piece of state written from outside the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    /// Successful sends so far
    pub sent_count: u64,
    /// Failed attempts since the last success (or since start)
    pub consecutive_errors: u32,
    /// Attempts made so far, successful or not
    pub attempts: u64,
}

impl RunState {
    /// Account for the outcome of an attempt.
    pub const fn record(&mut self, result: &AttemptResult) {
        self.attempts += 1;

        match result {
            AttemptResult::Success { .. } => {
                self.sent_count += 1;
                self.consecutive_errors = 0;
            }
            AttemptResult::Failure { .. } => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
            }
        }
    }

    /// Whether `max_count` successful sends have been made. Zero means no limit.
    #[must_use]
    pub const fn limit_reached(&self, max_count: u64) -> bool {
        max_count > 0 && self.sent_count >= max_count
    }

    /// Whether `max_attempts` attempts have been made. Zero means no limit.
    #[must_use]
    pub const fn attempts_exhausted(&self, max_attempts: u64) -> bool {
        max_attempts > 0 && self.attempts >= max_attempts
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    LimitReached,
    AttemptsExhausted,
    Cancelled,
}

impl Display for TerminationReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LimitReached => "limit reached",
            Self::AttemptsExhausted => "attempt limit reached",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Final report of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationSummary {
    pub sent_count: u64,
    pub attempts: u64,
    pub consecutive_errors: u32,
    pub reason: TerminationReason,
}

impl TerminationSummary {
    pub(crate) const fn new(state: RunState, reason: TerminationReason) -> Self {
        Self {
            sent_count: state.sent_count,
            attempts: state.attempts,
            consecutive_errors: state.consecutive_errors,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(id: &str) -> AttemptResult {
        AttemptResult::Success {
            delivery_id: DeliveryId(id.to_string()),
        }
    }

    fn failure() -> AttemptResult {
        AttemptResult::Failure {
            diagnostic: "Connection failed: refused".to_string(),
        }
    }

    #[test]
    fn test_record_tracks_consecutive_errors() {
        let mut state = RunState::default();
        let mut observed = Vec::new();

        for result in [failure(), failure(), success("<a@example.com>")] {
            state.record(&result);
            observed.push(state.consecutive_errors);
        }

        assert_eq!(observed, vec![1, 2, 0]);
        assert_eq!(state.sent_count, 1);
        assert_eq!(state.attempts, 3);
    }

    #[test]
    fn test_success_resets_any_error_streak() {
        let mut state = RunState {
            sent_count: 4,
            consecutive_errors: 37,
            attempts: 80,
        };

        state.record(&success("<b@example.com>"));

        assert_eq!(state.consecutive_errors, 0);
        assert_eq!(state.sent_count, 5);
    }

    #[test]
    fn test_limit_reached() {
        let mut state = RunState::default();
        assert!(!state.limit_reached(0));
        assert!(!state.limit_reached(3));

        state.sent_count = 3;
        assert!(state.limit_reached(3));
        assert!(!state.limit_reached(4));
        assert!(!state.limit_reached(0), "zero means unbounded");
    }

    #[test]
    fn test_failures_do_not_count_towards_limit() {
        let mut state = RunState::default();

        for _ in 0..10 {
            state.record(&failure());
        }

        assert!(!state.limit_reached(3));
        assert_eq!(state.attempts, 10);
    }

    #[test]
    fn test_attempts_exhausted_counts_failures() {
        let mut state = RunState::default();
        assert!(!state.attempts_exhausted(1));

        state.record(&failure());
        assert!(state.attempts_exhausted(1));
        assert!(!state.attempts_exhausted(2));
        assert!(!state.attempts_exhausted(0), "zero means unbounded");
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(TerminationReason::LimitReached.to_string(), "limit reached");
        assert_eq!(TerminationReason::Cancelled.to_string(), "cancelled");
        assert_eq!(
            TerminationReason::AttemptsExhausted.to_string(),
            "attempt limit reached"
        );
    }
}
