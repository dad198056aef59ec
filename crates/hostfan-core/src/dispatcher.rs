//! Single-host and group execution
//!
//! Resolves the selector, picks the output strategy, and runs one session
//! inline or one task per host, joining every task before returning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use hostfan_exec::{
    ExecError, LivenessProbe, Outcome, OutputSink, SessionRunner, Target, Terminal, Transport,
};
use hostfan_inventory::Inventory;

use crate::config::DispatchConfig;
use crate::error::CoreError;
use crate::monitor::CancellationMonitor;
use crate::request::{ExecutionReport, ExecutionRequest, Mode};

/// Entry point for running commands against the inventory
pub struct Dispatcher {
    inventory: Arc<dyn Inventory>,
    runner: SessionRunner,
    config: DispatchConfig,
    stdout: Terminal,
    stderr: Terminal,
}

impl Dispatcher {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        transport: Arc<dyn Transport>,
        probe: Arc<dyn LivenessProbe>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            inventory,
            runner: SessionRunner::new(transport, probe),
            config,
            stdout: Terminal::stdout(),
            stderr: Terminal::stderr(),
        }
    }

    /// Redirect relayed output and error lines
    #[must_use]
    pub fn with_terminals(mut self, stdout: Terminal, stderr: Terminal) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Run the request, cancelling in-flight sessions on termination signals
    ///
    /// # Errors
    /// Returns `CoreError::Resolution` if the selector cannot be resolved
    /// and `CoreError::Signal` if signal handlers cannot be installed.
    /// Per-host failures are reported in the returned [`ExecutionReport`].
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport, CoreError> {
        let monitor = CancellationMonitor::arm(CancellationToken::new())?;
        self.execute_with_cancel(request, monitor.token().clone())
            .await
    }

    /// Run the request under an externally owned cancellation token
    ///
    /// # Errors
    /// Returns `CoreError::Resolution` if the selector cannot be resolved;
    /// no session is started in that case
    #[instrument(skip_all, fields(mode = %request.mode, selector = %request.selector))]
    pub async fn execute_with_cancel(
        &self,
        request: &ExecutionRequest,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport, CoreError> {
        let sink = request
            .mode
            .output_mode()
            .sink(self.stdout.clone(), self.config.colored);

        let outcomes = match request.mode {
            Mode::Single => {
                let target = self.inventory.resolve_by_name(&request.selector)?;
                let outcome = self
                    .runner
                    .run_one(
                        &cancel,
                        &request.command,
                        &target,
                        sink,
                        request.effective_liveness_check(),
                    )
                    .await;
                if let Err(e) = &outcome.result {
                    self.report(None, e);
                }
                vec![outcome]
            }
            Mode::Group => {
                let targets = self.inventory.resolve_by_tag(&request.selector)?;
                // inventories other than the static one may declare empty groups
                if targets.is_empty() {
                    warn!(tag = %request.selector, "tag has no members, nothing to run");
                    if let Err(e) = self
                        .stderr
                        .write_line(&format!("no hosts tagged {}", request.selector))
                    {
                        error!(error = %e, "failed to write warning line");
                    }
                    return Ok(ExecutionReport {
                        mode: Mode::Group,
                        outcomes: Vec::new(),
                    });
                }
                self.fan_out(&request.command, targets, sink, cancel).await
            }
        };

        let report = ExecutionReport {
            mode: request.mode,
            outcomes,
        };
        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "execution finished"
        );
        Ok(report)
    }

    /// One task per target; errors are reported as each task completes
    async fn fan_out(
        &self,
        command: &str,
        targets: Vec<Target>,
        sink: Arc<dyn OutputSink>,
        cancel: CancellationToken,
    ) -> Vec<Outcome> {
        let limit = self
            .config
            .max_parallel
            .map(|n| Arc::new(Semaphore::new(n.get())));
        let expected = targets.len();

        info!(hosts = expected, limit = ?self.config.max_parallel, "dispatching");

        let mut tasks = JoinSet::new();
        let mut hosts = HashMap::with_capacity(expected);
        for target in targets {
            let host = target.name.clone();
            let runner = self.runner.clone();
            let sink = Arc::clone(&sink);
            let cancel = cancel.clone();
            let command = command.to_string();
            let limit = limit.clone();

            let handle = tasks.spawn(async move {
                // acquire fails only on a closed semaphore
                let _permit = match &limit {
                    Some(limit) => limit.clone().acquire_owned().await.ok(),
                    None => None,
                };
                runner.run_one(&cancel, &command, &target, sink, false).await
            });
            hosts.insert(handle.id(), host);
        }

        let mut outcomes = Vec::with_capacity(expected);
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, outcome)) => outcome,
                Err(e) => {
                    error!(error = %e, "host task panicked");
                    Outcome {
                        host: hosts.remove(&e.id()).unwrap_or_default(),
                        result: Err(ExecError::Exec(format!("task failed: {e}"))),
                        elapsed: Duration::ZERO,
                    }
                }
            };
            if let Err(e) = &outcome.result {
                self.report(Some(&outcome.host), e);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    fn report(&self, host: Option<&str>, err: &ExecError) {
        let line = match host {
            Some(host) => format!("{host}: {err}"),
            None => err.to_string(),
        };
        if let Err(e) = self.stderr.write_line(&line) {
            error!(error = %e, "failed to write error line");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
