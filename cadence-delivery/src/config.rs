//! Run configuration

use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

/// A mailbox: an address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub address: String,
    pub name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Domain part of the address, used to qualify generated message ids.
    pub fn domain(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map_or("localhost", |(_, domain)| domain)
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{name}\" <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Immutable settings for one run of the scheduler.
///
/// Created once at start-up and never mutated; the scheduler only ever reads
/// it.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Who the messages are from
    pub sender: Identity,

    /// Who the messages are sent to
    pub recipient: String,

    /// Delay between attempts (in milliseconds).
    ///
    /// After a failure the delay is multiplied by the backoff multiplier,
    /// after a success a small jitter is added.
    ///
    /// Default: 60000 (one minute)
    pub base_delay_ms: u64,

    /// Stop after this many successful sends. Failed attempts do not count.
    ///
    /// Default: 0 (never stop on count)
    pub max_count: u64,

    /// Stop after this many attempts, successful or not.
    ///
    /// A single attempt with no retry is `max_attempts = 1`.
    ///
    /// Default: 0 (never stop on attempts)
    pub max_attempts: u64,

    /// Prefix of every subject line
    ///
    /// Default: "Test"
    pub subject_prefix: String,

    /// Text placed at the top of every message body
    pub body_text: String,

    /// Also send a rich-text alternative of the body.
    ///
    /// Default: true
    pub html: bool,

    /// Granularity with which waits observe stop requests (in milliseconds).
    ///
    /// Default: 500
    pub poll_slice_ms: u64,

    /// Give up on a single attempt after this long (in seconds).
    ///
    /// A timed-out attempt counts as a failed one. `None` waits forever.
    ///
    /// Default: 120
    pub attempt_timeout_secs: Option<u64>,
}

impl RunConfig {
    /// Create a configuration with default cadence and content.
    #[must_use]
    pub fn new(sender: Identity, recipient: impl Into<String>) -> Self {
        Self {
            sender,
            recipient: recipient.into(),
            base_delay_ms: defaults::base_delay_ms(),
            max_count: 0,
            max_attempts: 0,
            subject_prefix: defaults::subject_prefix(),
            body_text: defaults::body_text(),
            html: defaults::html(),
            poll_slice_ms: defaults::poll_slice_ms(),
            attempt_timeout_secs: defaults::attempt_timeout_secs(),
        }
    }

    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Polling slice, never shorter than one millisecond.
    #[must_use]
    pub const fn poll_slice(&self) -> Duration {
        Duration::from_millis(if self.poll_slice_ms == 0 {
            1
        } else {
            self.poll_slice_ms
        })
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_secs.map(Duration::from_secs)
    }
}

mod defaults {
    pub const fn base_delay_ms() -> u64 {
        60_000
    }

    pub fn subject_prefix() -> String {
        "Test".to_string()
    }

    pub fn body_text() -> String {
        format!(
            "Hello, this is a test message sent by cadence at {}.",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        )
    }

    pub const fn html() -> bool {
        true
    }

    pub const fn poll_slice_ms() -> u64 {
        500
    }

    #[allow(clippy::unnecessary_wraps)]
    pub const fn attempt_timeout_secs() -> Option<u64> {
        Some(120)
    }
}
