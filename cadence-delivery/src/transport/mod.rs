//! The mail transport seam.
//!
//! The scheduler only ever talks to a [`MailTransport`]; [`SmtpRelay`] is the
//! production implementation on top of an authenticated SMTP relay.

mod smtp;

use async_trait::async_trait;

pub use smtp::{RelayConfig, SmtpRelay, TlsMode};

use crate::{
    error::TransportError,
    types::{DeliveryId, OutboundMessage},
};

/// Something that can deliver an [`OutboundMessage`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// One-time readiness probe: is the relay reachable and does it accept our
    /// credentials?
    ///
    /// # Errors
    /// If the relay cannot be reached or refuses the session
    async fn verify(&self) -> Result<(), TransportError>;

    /// Deliver one message and report the identifier it was accepted under.
    ///
    /// # Errors
    /// Any failure to build, submit, or have the message accepted
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryId, TransportError>;
}
