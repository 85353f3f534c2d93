//! Authenticated SMTP relay transport
//!
//! Connection handling, STARTTLS, AUTH and MIME encoding are delegated to
//! `lettre`. This module maps configuration onto its transport builder,
//! composes the MIME message, and classifies the errors it reports.

use std::{
    fmt::{self, Debug, Formatter},
    str::FromStr,
    time::Duration,
};

use async_trait::async_trait;
use cadence_common::{internal, outgoing};
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use serde::Deserialize;

use super::MailTransport;
use crate::{
    config::Identity,
    error::TransportError,
    types::{DeliveryId, OutboundMessage},
};

/// How the connection to the relay is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plaintext connection upgraded with STARTTLS (submission port 587)
    #[default]
    StartTls,
    /// TLS from the first byte (port 465)
    Tls,
    /// No encryption at all. Only for local test relays.
    None,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" => Ok(Self::Tls),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown TLS mode '{other}', expected one of: starttls, tls, none"
            )),
        }
    }
}

/// Relay connection settings
#[derive(Clone)]
pub struct RelayConfig {
    /// Relay hostname
    ///
    /// Default: smtp.gmail.com
    pub host: String,

    /// Relay port
    ///
    /// Default: 587
    pub port: u16,

    /// Connection security
    ///
    /// Default: STARTTLS
    pub tls: TlsMode,

    /// Account used to authenticate with the relay
    pub username: String,

    /// App password (or other credential) for `username`
    pub password: String,

    /// Timeout for connecting and for each SMTP command (in seconds)
    ///
    /// Default: 30
    pub timeout_secs: u64,
}

impl RelayConfig {
    /// Settings for the default relay with the given credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            tls: TlsMode::default(),
            username: username.into(),
            password: password.into(),
            timeout_secs: defaults::timeout_secs(),
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Debug for RelayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

mod defaults {
    pub fn host() -> String {
        "smtp.gmail.com".to_string()
    }

    pub const fn port() -> u16 {
        587
    }

    pub const fn timeout_secs() -> u64 {
        30
    }
}

/// [`MailTransport`] backed by an authenticated SMTP relay
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
}

impl SmtpRelay {
    /// Build a relay transport. No connection is made until [`MailTransport::verify`]
    /// or [`MailTransport::send`] is called.
    ///
    /// # Errors
    /// If the TLS parameters for `host` cannot be constructed
    pub fn new(config: &RelayConfig) -> Result<Self, TransportError> {
        let builder = match config.tls {
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
            TlsMode::None => {
                tracing::warn!(
                    host = %config.host,
                    "SECURITY WARNING: relay connection is not encrypted, credentials are sent in plaintext"
                );
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout()))
            .build();

        internal!(
            "SMTP relay transport configured for {}:{} ({:?})",
            config.host,
            config.port,
            config.tls
        );

        Ok(Self {
            transport,
            server: format!("{}:{}", config.host, config.port),
        })
    }
}

fn mailbox(identity: &Identity) -> Result<Mailbox, TransportError> {
    let address: Address = identity.address.parse()?;
    Ok(Mailbox::new(identity.name.clone(), address))
}

/// Encode an [`OutboundMessage`] as a MIME message.
///
/// With an HTML body the result is `multipart/alternative`, otherwise a single
/// `text/plain` part.
fn compose_mime(message: &OutboundMessage) -> Result<Message, TransportError> {
    let to: Mailbox = message.to.parse()?;

    let builder = Message::builder()
        .message_id(Some(message.message_id.clone()))
        .from(mailbox(&message.from)?)
        .to(to)
        .subject(message.subject.clone());

    let mime = match &message.html {
        Some(html) => builder.multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.clone()),
    }?;

    Ok(mime)
}

#[async_trait]
impl MailTransport for SmtpRelay {
    #[tracing::instrument(level = tracing::Level::DEBUG, skip(self), fields(server = %self.server))]
    async fn verify(&self) -> Result<(), TransportError> {
        if self.transport.test_connection().await? {
            Ok(())
        } else {
            Err(TransportError::Connection(format!(
                "{} did not accept the session",
                self.server
            )))
        }
    }

    #[tracing::instrument(
        level = tracing::Level::DEBUG,
        skip_all,
        fields(server = %self.server, message_id = %message.message_id)
    )]
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryId, TransportError> {
        let mime = compose_mime(message)?;
        let response = self.transport.send(mime).await?;

        outgoing!(
            level = DEBUG,
            "{} accepted {}: {} {}",
            self.server,
            message.message_id,
            response.code(),
            response.first_line().unwrap_or_default()
        );

        Ok(DeliveryId(message.message_id.clone()))
    }
}
