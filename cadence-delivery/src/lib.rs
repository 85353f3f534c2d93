//! Scheduled delivery of outbound test mail through an authenticated relay
//!
//! This crate provides:
//! - The [`MailTransport`] seam and its SMTP relay implementation
//! - A pure backoff/jitter policy for spacing attempts
//! - The attempt executor that turns one send into an [`AttemptResult`]
//! - The [`Scheduler`] send loop with cooperative, bounded-latency shutdown

mod config;
mod error;
mod executor;
pub mod policy;
mod scheduler;
pub mod transport;
mod types;

pub use cadence_common::shutdown::StopHandle;
pub use config::{Identity, RunConfig};
pub use error::{SchedulerError, TransportError};
pub use executor::AttemptExecutor;
pub use policy::BackoffPolicy;
pub use scheduler::{Scheduler, interruptible_sleep};
pub use transport::{MailTransport, RelayConfig, SmtpRelay, TlsMode};
pub use types::{
    AttemptResult, DeliveryId, OutboundMessage, RunState, TerminationReason, TerminationSummary,
};
