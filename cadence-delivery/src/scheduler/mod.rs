//! The send loop
//!
//! One attempt at a time, each followed by a wait chosen by the
//! [`BackoffPolicy`]. The loop stops when the configured number of messages
//! has been sent or when its [`StopHandle`] is tripped. A stop never aborts an
//! attempt that is already in flight: the attempt finishes, its outcome is
//! accounted, and only then does the loop exit.

mod wait;

use std::{sync::Arc, time::Duration};

use cadence_common::{internal, shutdown::StopHandle};
pub use wait::interruptible_sleep;

use crate::{
    config::RunConfig,
    error::SchedulerError,
    executor::AttemptExecutor,
    policy::BackoffPolicy,
    transport::MailTransport,
    types::{AttemptResult, RunState, TerminationReason, TerminationSummary},
};

/// Drives repeated sends for a single run.
///
/// All counters are owned by the scheduler; the only state shared with the
/// outside world is the stop flag.
pub struct Scheduler {
    config: RunConfig,
    executor: AttemptExecutor,
    policy: BackoffPolicy,
    stop: StopHandle,
    state: RunState,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: RunConfig, transport: Arc<dyn MailTransport>, stop: StopHandle) -> Self {
        Self {
            policy: BackoffPolicy::new(config.base_delay()),
            executor: AttemptExecutor::new(transport),
            config,
            stop,
            state: RunState::default(),
        }
    }

    /// Replace the default backoff policy (cap 16×, jitter up to 1s).
    #[must_use]
    pub const fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run until the limit is reached or a stop is requested.
    ///
    /// # Errors
    /// If the relay fails its readiness check; no attempt is made in that case
    #[tracing::instrument(
        level = tracing::Level::INFO,
        skip_all,
        fields(to = %self.config.recipient, max_count = self.config.max_count)
    )]
    pub async fn run(mut self) -> Result<TerminationSummary, SchedulerError> {
        self.executor
            .verify()
            .await
            .map_err(SchedulerError::Readiness)?;

        internal!(level = INFO, "Relay verified: ready to send");

        let reason = self.send_loop().await;
        let summary = TerminationSummary::new(self.state, reason);

        internal!(
            level = INFO,
            "Stopped ({reason}). Sent {} messages total",
            summary.sent_count
        );

        Ok(summary)
    }

    async fn send_loop(&mut self) -> TerminationReason {
        while self.stop.is_running() {
            if self.state.limit_reached(self.config.max_count) {
                internal!(
                    level = INFO,
                    "Reached max count ({}), stopping",
                    self.config.max_count
                );
                return TerminationReason::LimitReached;
            }

            if self.state.attempts_exhausted(self.config.max_attempts) {
                internal!(
                    level = INFO,
                    "Made {} attempt(s) without reaching the send limit, stopping",
                    self.state.attempts
                );
                return TerminationReason::AttemptsExhausted;
            }

            let result = self
                .executor
                .attempt(&self.config, self.state.sent_count)
                .await;
            self.state.record(&result);
            self.report(&result);

            if !self.stop.is_running() {
                return TerminationReason::Cancelled;
            }

            // The limit checks at the top of the loop end the run; there is no
            // next attempt to wait for.
            if self.state.limit_reached(self.config.max_count)
                || self.state.attempts_exhausted(self.config.max_attempts)
            {
                continue;
            }

            let wait = self.next_wait();
            if !interruptible_sleep(wait, self.config.poll_slice(), &self.stop).await {
                tracing::debug!("Wait cut short by a stop request");
            }
        }

        TerminationReason::Cancelled
    }

    fn next_wait(&self) -> Duration {
        let wait = self.policy.next_wait(&self.state, &mut rand::rng());

        if self.state.consecutive_errors > 0 {
            tracing::warn!(
                wait_ms = wait.as_millis(),
                "Waiting {} ms before next attempt (backoff multiplier {})",
                wait.as_millis(),
                self.policy.multiplier(self.state.consecutive_errors)
            );
        } else {
            tracing::debug!(wait_ms = wait.as_millis(), "Next attempt in {} ms", wait.as_millis());
        }

        wait
    }

    fn report(&self, result: &AttemptResult) {
        match result {
            AttemptResult::Success { delivery_id } => tracing::info!(
                sent = self.state.sent_count,
                %delivery_id,
                "Sent #{} -- id: {delivery_id}",
                self.state.sent_count
            ),
            AttemptResult::Failure { diagnostic } => tracing::error!(
                consecutive_errors = self.state.consecutive_errors,
                "Send failed (attempt {}): {diagnostic}",
                self.state.consecutive_errors
            ),
        }
    }
}
