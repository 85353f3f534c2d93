//! Scripted mail transport for exercising the scheduler
//!
//! The mock replays a list of scripted outcomes, one per `send`, then falls
//! back to succeeding. Every send is recorded with the (tokio) instant it
//! started, so tests running on a paused clock can assert exact spacing.
//!
//! # Example
//!
//! ```rust,no_run
//! let transport = MockTransport::builder()
//!     .fail("421 try again later")
//!     .fail("421 try again later")
//!     .succeed()
//!     .build();
//! ```
#![allow(dead_code)]

use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use cadence_delivery::{DeliveryId, MailTransport, OutboundMessage, StopHandle, TransportError};
use tokio::{sync::Mutex, time::Instant};

/// One scripted `send` outcome
#[derive(Debug, Clone)]
pub struct Step {
    /// `None` succeeds, `Some(reason)` fails with a deferral
    pub failure: Option<String>,
    /// How long the send takes before reporting
    pub delay: Duration,
}

/// A send the mock observed
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub started: Instant,
    pub finished: Instant,
    pub subject: String,
    pub message_id: String,
    pub succeeded: bool,
}

#[derive(Default)]
pub struct MockTransportBuilder {
    script: VecDeque<Step>,
    verify_failure: Option<String>,
    default_delay: Duration,
    stop_during_send: Option<(usize, StopHandle)>,
}

impl MockTransportBuilder {
    pub fn succeed(self) -> Self {
        self.step(None, Duration::ZERO)
    }

    pub fn fail(self, reason: &str) -> Self {
        self.step(Some(reason.to_string()), Duration::ZERO)
    }

    pub fn step(mut self, failure: Option<String>, delay: Duration) -> Self {
        self.script.push_back(Step { failure, delay });
        self
    }

    /// Delay applied to unscripted sends
    pub const fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn fail_verification(mut self, reason: &str) -> Self {
        self.verify_failure = Some(reason.to_string());
        self
    }

    /// Trip `handle` while the `nth` send (1-based) is in flight
    pub fn stop_during_send(mut self, nth: usize, handle: StopHandle) -> Self {
        self.stop_during_send = Some((nth, handle));
        self
    }

    pub fn build(self) -> Arc<MockTransport> {
        Arc::new(MockTransport {
            script: Mutex::new(self.script),
            verify_failure: self.verify_failure,
            default_delay: self.default_delay,
            stop_during_send: self.stop_during_send,
            sends: Mutex::new(Vec::new()),
            verifications: Mutex::new(0),
        })
    }
}

pub struct MockTransport {
    script: Mutex<VecDeque<Step>>,
    verify_failure: Option<String>,
    default_delay: Duration,
    stop_during_send: Option<(usize, StopHandle)>,
    sends: Mutex<Vec<SendRecord>>,
    verifications: Mutex<usize>,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    pub async fn sends(&self) -> Vec<SendRecord> {
        self.sends.lock().await.clone()
    }

    pub async fn verifications(&self) -> usize {
        *self.verifications.lock().await
    }

    /// Gaps between the end of one send and the start of the next
    pub async fn waits(&self) -> Vec<Duration> {
        self.sends()
            .await
            .windows(2)
            .map(|pair| pair[1].started - pair[0].finished)
            .collect()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn verify(&self) -> Result<(), TransportError> {
        *self.verifications.lock().await += 1;

        match &self.verify_failure {
            Some(reason) => Err(TransportError::Authentication(reason.clone())),
            None => Ok(()),
        }
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryId, TransportError> {
        let started = Instant::now();
        let step = self.script.lock().await.pop_front().unwrap_or(Step {
            failure: None,
            delay: self.default_delay,
        });

        let nth = self.sends.lock().await.len() + 1;
        if let Some((target, handle)) = &self.stop_during_send
            && *target == nth
        {
            handle.stop();
        }

        tokio::time::sleep(step.delay).await;

        self.sends.lock().await.push(SendRecord {
            started,
            finished: Instant::now(),
            subject: message.subject.clone(),
            message_id: message.message_id.clone(),
            succeeded: step.failure.is_none(),
        });

        match step.failure {
            Some(reason) => Err(TransportError::Deferred(reason)),
            None => Ok(DeliveryId(message.message_id.clone())),
        }
    }
}
