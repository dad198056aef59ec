//! Error types for hostfan-exec

use thiserror::Error;

/// Errors that can occur while driving one remote execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Failed to reach or authenticate against the remote host
    #[error("connection failed: {0}")]
    Connection(String),

    /// Connection established but no execution session could be opened
    #[error("session failed: {0}")]
    Session(String),

    /// Remote command finished with a non-zero exit status
    #[error("command exited with status {status}")]
    CommandFailed {
        /// Exit status reported by the remote side
        status: u32,
    },

    /// Transport failure while the command was running
    #[error("execution failed: {0}")]
    Exec(String),

    /// Session was torn down by a cancellation request
    #[error("cancelled")]
    Cancelled,

    /// Reading the session output stream failed
    #[error("output relay failed: {0}")]
    Relay(String),

    /// SSH key could not be resolved
    #[error("SSH key error: {0}")]
    Key(String),
}

/// Coarse classification of an [`ExecError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport, authentication or liveness probe failure
    Connection,
    /// Session open failure
    Session,
    /// Remote command failed or was interrupted
    Exec,
    /// Output stream failure
    Relay,
}

impl ExecError {
    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecError::Connection(_) | ExecError::Key(_) => FailureKind::Connection,
            ExecError::Session(_) => FailureKind::Session,
            ExecError::CommandFailed { .. } | ExecError::Exec(_) | ExecError::Cancelled => {
                FailureKind::Exec
            }
            ExecError::Relay(_) => FailureKind::Relay,
        }
    }

    /// Check if the error was caused by cancellation
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ExecError::Connection("refused".into()).kind(),
            FailureKind::Connection
        );
        assert_eq!(ExecError::Key("bad".into()).kind(), FailureKind::Connection);
        assert_eq!(ExecError::Session("denied".into()).kind(), FailureKind::Session);
        assert_eq!(ExecError::CommandFailed { status: 1 }.kind(), FailureKind::Exec);
        assert_eq!(ExecError::Cancelled.kind(), FailureKind::Exec);
        assert_eq!(ExecError::Relay("eio".into()).kind(), FailureKind::Relay);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ExecError::CommandFailed { status: 2 }.to_string(),
            "command exited with status 2"
        );
        assert!(ExecError::Cancelled.is_cancelled());
    }
}
