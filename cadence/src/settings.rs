//! Start-up settings
//!
//! Values are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional RON configuration file
//! 3. environment variables (a `.env` file is loaded by the binary)
//! 4. command-line flags
//!
//! Layers 3 and 4 are both handled by [`Cli`], since every flag has an
//! environment fallback.

use std::path::{Path, PathBuf};

use cadence_delivery::{Identity, RelayConfig, RunConfig, TlsMode};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "CADENCE_CONFIG";

/// Older names for the sender and password, read when the current ones are unset
pub const FALLBACK_SENDER_ENV: &str = "GMAIL_USER";
pub const FALLBACK_PASSWORD_ENV: &str = "APP_PASSWORD";

/// Display name used when none is configured
pub const DEFAULT_SENDER_NAME: &str = "Cadence Loop Test";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("Missing required setting(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Send test messages through an SMTP relay on a fixed cadence
#[derive(Parser, Debug, Default)]
#[command(name = "cadence")]
#[command(about = "Send test messages through an SMTP relay on a schedule", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a RON configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SMTP_USER",
        help = "Account the messages are sent from (also the relay login) [fallback env: GMAIL_USER]"
    )]
    pub sender: Option<String>,

    /// Display name for the sender
    #[arg(long, env = "SENDER_NAME")]
    pub sender_name: Option<String>,

    #[arg(
        long,
        env = "SMTP_PASSWORD",
        hide_env_values = true,
        help = "App password for the sender account [fallback env: APP_PASSWORD]"
    )]
    pub password: Option<String>,

    /// Recipient address
    #[arg(long, env = "TO_ADDRESS")]
    pub to: Option<String>,

    /// Base delay between attempts, in milliseconds
    #[arg(long, env = "DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Stop after this many successful sends (0 runs until stopped)
    #[arg(long, env = "MAX_COUNT")]
    pub max_count: Option<u64>,

    /// Stop after this many attempts, successful or not (0 never stops)
    #[arg(long, env = "MAX_ATTEMPTS")]
    pub max_attempts: Option<u64>,

    /// Make a single attempt and exit without retrying a failure.
    /// Overrides --max-count and --max-attempts.
    #[arg(long)]
    pub once: bool,

    /// Prefix of every subject line
    #[arg(long, env = "SUBJECT_PREFIX")]
    pub subject_prefix: Option<String>,

    /// Text at the top of every message body
    #[arg(long, env = "BODY_TEXT")]
    pub body_text: Option<String>,

    /// Relay hostname
    #[arg(long, env = "SMTP_HOST")]
    pub host: Option<String>,

    /// Relay port
    #[arg(long, env = "SMTP_PORT")]
    pub port: Option<u16>,

    /// Connection security: starttls, tls or none
    #[arg(long, env = "SMTP_TLS")]
    pub tls: Option<TlsMode>,

    /// How often waits check for a stop request, in milliseconds
    #[arg(long, env = "POLL_SLICE_MS")]
    pub poll_slice_ms: Option<u64>,

    /// Abandon an attempt after this many seconds (0 never abandons)
    #[arg(long, env = "ATTEMPT_TIMEOUT_SECS")]
    pub attempt_timeout_secs: Option<u64>,

    /// Send plain text only
    #[arg(long)]
    pub no_html: bool,
}

/// Everything that can be configured, as read from a configuration file.
///
/// Every field is optional here; [`Settings::resolve`] applies defaults and
/// rejects settings that are still missing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub sender: Option<String>,
    pub sender_name: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
    pub delay_ms: Option<u64>,
    pub max_count: Option<u64>,
    pub max_attempts: Option<u64>,
    pub subject_prefix: Option<String>,
    pub body_text: Option<String>,
    pub html: Option<bool>,
    pub poll_slice_ms: Option<u64>,
    pub attempt_timeout_secs: Option<u64>,
    pub relay: RelaySettings,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsMode>,
    pub timeout_secs: Option<u64>,
}

/// Validated settings, ready to hand to the scheduler and the relay
#[derive(Debug, Clone)]
pub struct Resolved {
    pub run: RunConfig,
    pub relay: RelayConfig,
}

impl Settings {
    /// Load settings from the file chosen by [`find_config_file`] (if any) and
    /// overlay the command line.
    ///
    /// # Errors
    /// If a named configuration file is missing, unreadable or malformed
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = find_config_file(cli.config.as_deref(), &default_paths())?;

        let settings = match file {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        Ok(settings
            .overlay(cli)
            .with_fallback_env(|name| std::env::var(name).ok()))
    }

    /// Parse a RON configuration file.
    ///
    /// # Errors
    /// If the file cannot be read or is not valid RON for [`Settings`]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line (and environment) values on top of these settings.
    #[must_use]
    pub fn overlay(self, cli: &Cli) -> Self {
        Self {
            sender: cli.sender.clone().or(self.sender),
            sender_name: cli.sender_name.clone().or(self.sender_name),
            password: cli.password.clone().or(self.password),
            recipient: cli.to.clone().or(self.recipient),
            delay_ms: cli.delay_ms.or(self.delay_ms),
            max_count: if cli.once {
                Some(1)
            } else {
                cli.max_count.or(self.max_count)
            },
            max_attempts: if cli.once {
                Some(1)
            } else {
                cli.max_attempts.or(self.max_attempts)
            },
            subject_prefix: cli.subject_prefix.clone().or(self.subject_prefix),
            body_text: cli.body_text.clone().or(self.body_text),
            html: if cli.no_html { Some(false) } else { self.html },
            poll_slice_ms: cli.poll_slice_ms.or(self.poll_slice_ms),
            attempt_timeout_secs: cli.attempt_timeout_secs.or(self.attempt_timeout_secs),
            relay: RelaySettings {
                host: cli.host.clone().or(self.relay.host),
                port: cli.port.or(self.relay.port),
                tls: cli.tls.or(self.relay.tls),
                timeout_secs: self.relay.timeout_secs,
            },
        }
    }

    /// Fill a missing sender or password from [`FALLBACK_SENDER_ENV`] and
    /// [`FALLBACK_PASSWORD_ENV`], looked up through `lookup`.
    #[must_use]
    pub fn with_fallback_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.sender.is_none() {
            self.sender = lookup(FALLBACK_SENDER_ENV);
        }
        if self.password.is_none() {
            self.password = lookup(FALLBACK_PASSWORD_ENV);
        }
        self
    }

    /// Apply defaults and validate.
    ///
    /// # Errors
    /// [`ConfigError::Missing`] listing every absent required setting, or
    /// [`ConfigError::Invalid`] for the first malformed one
    pub fn resolve(self) -> Result<Resolved, ConfigError> {
        let sender = required(self.sender);
        let password = required(self.password);
        let recipient = required(self.recipient);

        let missing: Vec<_> = [
            (sender.is_none(), "sender (SMTP_USER)"),
            (password.is_none(), "password (SMTP_PASSWORD)"),
            (recipient.is_none(), "recipient (TO_ADDRESS)"),
        ]
        .into_iter()
        .filter_map(|(absent, name)| absent.then_some(name))
        .collect();

        let (Some(sender), Some(password), Some(recipient)) = (sender, password, recipient) else {
            return Err(ConfigError::Missing(missing));
        };

        check_address("sender", &sender)?;
        check_address("recipient", &recipient)?;

        if self.relay.port == Some(0) {
            return Err(ConfigError::Invalid {
                field: "port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }

        let mut run = RunConfig::new(
            Identity::new(sender.clone())
                .with_name(self.sender_name.unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string())),
            recipient,
        );
        if let Some(delay_ms) = self.delay_ms {
            run.base_delay_ms = delay_ms;
        }
        if let Some(max_count) = self.max_count {
            run.max_count = max_count;
        }
        if let Some(max_attempts) = self.max_attempts {
            run.max_attempts = max_attempts;
        }
        if let Some(prefix) = self.subject_prefix {
            run.subject_prefix = prefix;
        }
        if let Some(body) = self.body_text {
            run.body_text = body;
        }
        if let Some(html) = self.html {
            run.html = html;
        }
        if let Some(slice) = self.poll_slice_ms {
            run.poll_slice_ms = slice;
        }
        if let Some(timeout) = self.attempt_timeout_secs {
            run.attempt_timeout_secs = (timeout > 0).then_some(timeout);
        }

        let mut relay = RelayConfig::new(sender, password);
        if let Some(host) = self.relay.host {
            relay.host = host;
        }
        if let Some(port) = self.relay.port {
            relay.port = port;
        }
        if let Some(tls) = self.relay.tls {
            relay.tls = tls;
        }
        if let Some(timeout) = self.relay.timeout_secs {
            relay.timeout_secs = timeout;
        }

        Ok(Resolved { run, relay })
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_address(field: &'static str, address: &str) -> Result<(), ConfigError> {
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("'{address}' is not an email address"),
        }),
    }
}

/// Default configuration file locations, in the order they are tried
pub fn default_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./cadence.config.ron"),
        PathBuf::from("/etc/cadence/cadence.config.ron"),
    ]
}

/// Find the configuration file using the following precedence:
/// 1. an explicit path (`--config` or `CADENCE_CONFIG`), which must exist
/// 2. the first of `candidates` that exists
///
/// Having no configuration file at all is fine; everything can come from the
/// environment.
///
/// # Errors
/// If an explicitly named file does not exist
pub fn find_config_file(
    explicit: Option<&Path>,
    candidates: &[PathBuf],
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    Ok(candidates.iter().find(|path| path.exists()).cloned())
}
