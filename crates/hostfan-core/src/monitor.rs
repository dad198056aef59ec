//! Termination signals to cooperative cancellation

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CoreError;

/// One-shot watcher that trips a token on the first termination signal
///
/// Watches SIGHUP, SIGINT, SIGTERM and SIGQUIT on unix and Ctrl-C
/// elsewhere. Dropping the monitor disarms it without touching the token.
#[derive(Debug)]
pub struct CancellationMonitor {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CancellationMonitor {
    /// Install signal handlers and start watching
    ///
    /// Handlers are registered before this returns, so a signal delivered
    /// right afterwards is not missed.
    ///
    /// # Errors
    /// Returns `CoreError::Signal` if the handlers cannot be registered
    pub fn arm(token: CancellationToken) -> Result<Self, CoreError> {
        let signals = TerminationSignals::register()?;
        let watched = token.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                name = signals.recv() => {
                    info!(signal = name, "termination signal received, cancelling");
                    watched.cancel();
                }
                () = watched.cancelled() => debug!("token cancelled elsewhere"),
            }
        });

        Ok(Self { token, task })
    }

    /// The token this monitor trips
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CancellationMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(unix)]
struct TerminationSignals {
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn register() -> Result<Self, CoreError> {
        use tokio::signal::unix::{SignalKind, signal};

        let install = |kind: SignalKind| signal(kind).map_err(|e| CoreError::Signal(e.to_string()));

        Ok(Self {
            hangup: install(SignalKind::hangup())?,
            interrupt: install(SignalKind::interrupt())?,
            terminate: install(SignalKind::terminate())?,
            quit: install(SignalKind::quit())?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    fn register() -> Result<Self, CoreError> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "ctrl-c",
            Err(_) => std::future::pending().await,
        }
    }
}
