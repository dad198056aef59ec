//! Per-host execution results

use std::time::Duration;

use crate::error::ExecError;

/// Result of running one command on one host
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Host identity the result belongs to
    pub host: String,
    /// Success, or the failure that ended the run
    pub result: Result<(), ExecError>,
    /// Wall time from connect to release
    pub elapsed: Duration,
}

impl Outcome {
    /// Check if the command succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The failure, if any
    #[must_use]
    pub fn error(&self) -> Option<&ExecError> {
        self.result.as_ref().err()
    }
}
