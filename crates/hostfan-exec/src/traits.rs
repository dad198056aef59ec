//! Transport seams consumed by the session runner
//!
//! Any transport implementing these traits is interchangeable; the runner
//! never looks past them.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::ExecError;
use crate::target::Target;

/// Byte stream carrying a session's output
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Establishes authenticated connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and authenticate to the target
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, ExecError>;
}

/// A live connection to one host
#[async_trait]
pub trait Connection: Send {
    /// Open a remote execution session on this connection
    async fn open_session(&mut self) -> Result<Box<dyn RemoteSession>, ExecError>;

    /// Close the connection
    async fn close(&mut self);
}

/// One remote command-execution context
#[async_trait]
pub trait RemoteSession: Send {
    /// Take the output stream
    ///
    /// The stream is ready as soon as the session is open, so a relay can be
    /// attached before the command is issued. Returns `None` once taken.
    fn take_output(&mut self) -> Option<OutputStream>;

    /// Run the command and wait for the remote side to report completion
    ///
    /// Implementations must end the output stream when this returns.
    async fn execute(&mut self, command: &str) -> Result<(), ExecError>;

    /// Close the session, ending the output stream
    async fn close(&mut self);
}

/// Pre-flight reachability check
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Probe the target, returning the round-trip latency
    async fn probe(&self, target: &Target) -> Result<Duration, ExecError>;
}
