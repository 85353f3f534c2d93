//! Wait policy between attempts.
//!
//! The policy is a pure function of the run state and the base delay; the only
//! outside input is the random source used for jitter after a success.

mod backoff;

pub use backoff::{BackoffPolicy, DEFAULT_CAP_MULTIPLIER, DEFAULT_MAX_JITTER_MS};
