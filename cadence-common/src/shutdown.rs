//! Cooperative stop requests.
//!
//! A [`StopHandle`] is a one-directional flag: it starts out running and can
//! only ever be flipped to stopped. The scheduler polls it at its checkpoints,
//! while [`listen`] trips it from the process's signal handlers.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::signal::unix::{SignalKind, signal};

use crate::{Signal, internal};

/// Shared, cloneable stop flag.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    /// Create a handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether no stop has been requested yet.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request a stop.
    ///
    /// Returns `true` only for the call that actually flipped the flag, so
    /// callers can tell a first request from a repeated one.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

/// Wait for SIGINT or SIGTERM and trip `handle` on each one.
///
/// Never returns on its own; callers race it against the work they want to
/// stop. Only the first signal has an effect, later ones are logged and
/// ignored since an in-flight send is never abandoned.
///
/// # Errors
/// If the signal handlers cannot be installed
#[tracing::instrument(level = tracing::Level::TRACE, skip_all)]
pub async fn listen(handle: StopHandle) -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        let sig = tokio::select! {
            r = tokio::signal::ctrl_c() => {
                r?;
                Signal::Interrupt
            }
            _ = terminate.recv() => Signal::Terminate,
        };

        if handle.stop() {
            internal!(
                level = INFO,
                "Received {sig} -- will finish current send (if any) and exit"
            );
        } else {
            tracing::debug!("Received {sig} while already stopping, ignoring");
        }
    }
}
