//! Typed error handling for relay delivery.
//!
//! Every [`TransportError`] is recoverable from the scheduler's point of view:
//! it becomes a failed attempt and drives backoff. The permanent/transient
//! split only affects how failures are reported. [`SchedulerError`] covers the
//! fatal, pre-run failures.

use thiserror::Error;

/// Failure of a single transport operation (readiness probe or send).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The relay refused the supplied credentials (530, 534, 535).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The relay rejected the message with a permanent (5xx) reply.
    #[error("Message rejected: {0}")]
    Rejected(String),

    /// The relay deferred the message with a transient (4xx) reply.
    #[error("Message deferred: {0}")]
    Deferred(String),

    /// No reply arrived in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Connecting to or talking to the relay failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The outbound message could not be built (bad address, bad header).
    #[error("Invalid message: {0}")]
    Message(String),
}

impl TransportError {
    /// Returns `true` if retrying the same message cannot succeed without a
    /// configuration change.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::Rejected(_) | Self::Message(_)
        )
    }

    /// Returns `true` if the failure is likely to clear up on its own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !self.is_permanent()
    }
}

/// Classify errors from `lettre`'s SMTP transport.
///
/// - **Timeouts** → `Timeout`
/// - **530/534/535** → `Authentication`
/// - **Other 5xx** → `Rejected`
/// - **4xx** → `Deferred`
/// - **Everything else** (I/O, TLS, protocol) → `Connection`
impl From<lettre::transport::smtp::Error> for TransportError {
    fn from(error: lettre::transport::smtp::Error) -> Self {
        let code = error.status().map(|code| code.to_string());

        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_permanent() {
            match code.as_deref() {
                Some("530" | "534" | "535") => Self::Authentication(error.to_string()),
                _ => Self::Rejected(error.to_string()),
            }
        } else if error.is_transient() {
            Self::Deferred(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

impl From<lettre::error::Error> for TransportError {
    fn from(error: lettre::error::Error) -> Self {
        Self::Message(error.to_string())
    }
}

impl From<lettre::address::AddressError> for TransportError {
    fn from(error: lettre::address::AddressError) -> Self {
        Self::Message(format!("Invalid address: {error}"))
    }
}

/// Fatal errors that end a run before any attempt is made.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The one-time readiness probe against the relay failed.
    #[error("Relay readiness check failed: {0}")]
    Readiness(#[source] TransportError),
}
