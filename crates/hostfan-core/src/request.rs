//! Execution requests and reports

use std::fmt;

use hostfan_exec::{OutputMode, Outcome};

/// How the selector is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Selector is an exact host name
    Single,
    /// Selector is a tag naming a group of hosts
    Group,
}

impl Mode {
    /// Output strategy for this mode
    #[must_use]
    pub fn output_mode(self) -> OutputMode {
        match self {
            Mode::Single => OutputMode::Raw,
            Mode::Group => OutputMode::Prefixed,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Single => write!(f, "single"),
            Mode::Group => write!(f, "group"),
        }
    }
}

/// A command to run against a host or a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Shell command run on the remote side
    pub command: String,
    /// Host name or tag, depending on `mode`
    pub selector: String,
    pub mode: Mode,
    /// Probe the host before connecting (single mode only)
    pub liveness_check: bool,
}

impl ExecutionRequest {
    /// Run on one host by name
    pub fn single(command: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            selector: name.into(),
            mode: Mode::Single,
            liveness_check: false,
        }
    }

    /// Run on every host carrying `tag`
    pub fn group(command: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            selector: tag.into(),
            mode: Mode::Group,
            liveness_check: false,
        }
    }

    /// Request a liveness probe before connecting
    #[must_use]
    pub fn with_liveness_check(mut self, liveness_check: bool) -> Self {
        self.liveness_check = liveness_check;
        self
    }

    /// Whether the probe actually runs
    ///
    /// Group runs never probe, whatever was requested.
    #[must_use]
    pub fn effective_liveness_check(&self) -> bool {
        self.mode == Mode::Single && self.liveness_check
    }
}

/// Every outcome of one invocation
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub mode: Mode,
    /// One outcome per resolved target, in completion order
    pub outcomes: Vec<Outcome>,
}

impl ExecutionReport {
    /// Outcomes that succeeded
    pub fn succeeded(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// Outcomes that failed
    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_success)
    }

    /// Process exit code for this report
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_succeeded())
    }

    /// Outcome for a host, if it ran
    #[must_use]
    pub fn outcome(&self, host: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.host == host)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hostfan_exec::ExecError;

    use super::*;

    fn outcome(host: &str, result: Result<(), ExecError>) -> Outcome {
        Outcome {
            host: host.to_string(),
            result,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_group_never_probes() {
        let request = ExecutionRequest::group("uptime", "web").with_liveness_check(true);
        assert!(!request.effective_liveness_check());

        let request = ExecutionRequest::single("uptime", "web-1").with_liveness_check(true);
        assert!(request.effective_liveness_check());
    }

    #[test]
    fn test_output_mode_per_mode() {
        assert_eq!(Mode::Single.output_mode(), OutputMode::Raw);
        assert_eq!(Mode::Group.output_mode(), OutputMode::Prefixed);
    }

    #[test]
    fn test_report_exit_code() {
        let report = ExecutionReport {
            mode: Mode::Group,
            outcomes: vec![
                outcome("a", Ok(())),
                outcome("b", Err(ExecError::Connection("refused".into()))),
            ],
        };
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failed().next().unwrap().host, "b");

        let empty = ExecutionReport {
            mode: Mode::Group,
            outcomes: vec![],
        };
        assert_eq!(empty.exit_code(), 0);
    }
}
