//! One attempt: compose a message, hand it to the transport, report back.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use ulid::Ulid;

use crate::{
    config::RunConfig,
    error::TransportError,
    transport::MailTransport,
    types::{AttemptResult, DeliveryId, OutboundMessage},
};

/// Runs single send attempts against a [`MailTransport`].
///
/// The executor never mutates run state; the scheduler applies the returned
/// [`AttemptResult`] itself.
#[derive(Clone)]
pub struct AttemptExecutor {
    transport: Arc<dyn MailTransport>,
}

impl AttemptExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Build the message for attempt index `sent_count + 1` at time `now`.
    #[must_use]
    pub fn compose(config: &RunConfig, sent_count: u64, now: DateTime<Utc>) -> OutboundMessage {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let index = sent_count + 1;

        OutboundMessage {
            message_id: format!("<{}@{}>", Ulid::new(), config.sender.domain()),
            from: config.sender.clone(),
            to: config.recipient.clone(),
            subject: format!("{} #{index} {timestamp}", config.subject_prefix),
            text: format!("{}\n\nSent at {timestamp}", config.body_text),
            html: config.html.then(|| {
                format!(
                    "<p>{}</p><p>Sent at <b>{timestamp}</b></p>",
                    config.body_text
                )
            }),
        }
    }

    /// Run the transport's readiness probe.
    ///
    /// # Errors
    /// Whatever the transport reports
    pub async fn verify(&self) -> Result<(), TransportError> {
        self.transport.verify().await
    }

    /// Make one attempt and convert its outcome into an [`AttemptResult`].
    ///
    /// Transport failures, including running past `attempt_timeout`, are
    /// folded into [`AttemptResult::Failure`] and never propagated.
    pub async fn attempt(&self, config: &RunConfig, sent_count: u64) -> AttemptResult {
        let message = Self::compose(config, sent_count, Utc::now());

        match self.submit(&message, config.attempt_timeout()).await {
            Ok(delivery_id) => AttemptResult::Success { delivery_id },
            Err(e) => {
                if e.is_transient() {
                    tracing::debug!("Relay failure looks transient, backing off");
                } else {
                    tracing::warn!(
                        "The relay reported a permanent failure, later attempts are likely to fail the same way"
                    );
                }

                AttemptResult::Failure {
                    diagnostic: e.to_string(),
                }
            }
        }
    }

    async fn submit(
        &self,
        message: &OutboundMessage,
        timeout: Option<Duration>,
    ) -> Result<DeliveryId, TransportError> {
        let Some(limit) = timeout else {
            return self.transport.send(message).await;
        };

        tokio::time::timeout(limit, self.transport.send(message))
            .await
            .map_err(|_| {
                TransportError::Timeout(format!("no outcome from the relay within {limit:?}"))
            })?
    }
}
