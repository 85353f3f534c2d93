use std::sync::Arc;

use anyhow::Context;
use cadence_common::{internal, shutdown};
use cadence_delivery::{
    RelayConfig, RunConfig, Scheduler, SchedulerError, SmtpRelay, StopHandle, TerminationSummary,
};
use tokio::task::JoinError;

use crate::settings::Resolved;

/// Owns one run: builds the relay, starts the scheduler and wires up signal
/// handling.
pub struct Controller {
    run: RunConfig,
    relay: RelayConfig,
    stop: StopHandle,
}

impl Controller {
    #[must_use]
    pub fn new(settings: Resolved) -> Self {
        Self {
            run: settings.run,
            relay: settings.relay,
            stop: StopHandle::new(),
        }
    }

    fn banner(&self) {
        let max = if self.run.max_count == 0 {
            "infinite".to_string()
        } else {
            self.run.max_count.to_string()
        };

        internal!(
            level = INFO,
            "Starting send loop: {} -> {} via {}:{} ({:?}), delay {} ms, max {max}",
            self.run.sender,
            self.run.recipient,
            self.relay.host,
            self.relay.port,
            self.relay.tls,
            self.run.base_delay_ms,
        );
    }

    /// Run until the scheduler finishes or a signal stops it.
    ///
    /// # Errors
    ///
    /// This function will return an error if the relay cannot be set up, if it
    /// fails its readiness check, if signal handlers cannot be installed, or
    /// if the scheduler task panics.
    #[tracing::instrument(level = tracing::Level::TRACE, skip_all)]
    pub async fn run(self) -> anyhow::Result<TerminationSummary> {
        self.banner();

        let transport = Arc::new(
            SmtpRelay::new(&self.relay).context("Failed to configure the SMTP relay")?,
        );
        let scheduler = Scheduler::new(self.run, transport, self.stop.clone());
        let mut task = tokio::spawn(scheduler.run());

        let joined = tokio::select! {
            joined = &mut task => joined,
            listener = shutdown::listen(self.stop.clone()) => {
                if let Err(e) = listener {
                    self.stop.stop();
                    tracing::error!("{}", describe_outcome(&task.await));
                    return Err(e).context("Failed to install signal handlers");
                }
                task.await
            }
        };

        let summary = joined.context("Scheduler task failed")??;

        internal!(
            level = INFO,
            "Finished: {} sent in {} attempts ({})",
            summary.sent_count,
            summary.attempts,
            summary.reason
        );

        Ok(summary)
    }
}

/// One line describing how the scheduler task ended
fn describe_outcome(
    joined: &Result<Result<TerminationSummary, SchedulerError>, JoinError>,
) -> String {
    match joined {
        Ok(Ok(summary)) => format!(
            "Scheduler stopped ({}) after sending {} messages",
            summary.reason, summary.sent_count
        ),
        Ok(Err(e)) => format!("Scheduler failed: {e}"),
        Err(e) => format!("Scheduler task failed: {e}"),
    }
}
