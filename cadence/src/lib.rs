//! Scheduled outbound test mail
//!
//! Sends a message through an authenticated SMTP relay, waits, and repeats
//! until a count is reached or the process is asked to stop. Waits back off
//! exponentially while the relay keeps failing.

pub mod controller;
pub mod settings;

pub use controller::Controller;
pub use settings::{Cli, ConfigError, Resolved, Settings};
