//! Drives one remote session end-to-end
//!
//! Connect, open a session, attach the output relay, execute, and release,
//! with every suspension point racing the shared cancellation token.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::output::OutputSink;
use crate::result::Outcome;
use crate::target::Target;
use crate::traits::{Connection, LivenessProbe, RemoteSession, Transport};

/// Runs commands on single targets
#[derive(Clone)]
pub struct SessionRunner {
    transport: Arc<dyn Transport>,
    probe: Arc<dyn LivenessProbe>,
}

impl SessionRunner {
    pub fn new(transport: Arc<dyn Transport>, probe: Arc<dyn LivenessProbe>) -> Self {
        Self { transport, probe }
    }

    /// Run `command` on `target`, relaying output into `sink`
    ///
    /// Never panics and never returns early on failure: every error becomes
    /// the returned [`Outcome`]. All resources acquired for the run are
    /// released before this returns, including on cancellation.
    #[instrument(skip_all, fields(host = %target.name))]
    pub async fn run_one(
        &self,
        cancel: &CancellationToken,
        command: &str,
        target: &Target,
        sink: Arc<dyn OutputSink>,
        liveness_check: bool,
    ) -> Outcome {
        let start = Instant::now();
        let result = self
            .drive(cancel, command, target, sink, liveness_check)
            .await;

        match &result {
            Ok(()) => debug!(elapsed = ?start.elapsed(), "command succeeded"),
            Err(e) => debug!(elapsed = ?start.elapsed(), error = %e, "command failed"),
        }

        Outcome {
            host: target.name.clone(),
            result,
            elapsed: start.elapsed(),
        }
    }

    async fn drive(
        &self,
        cancel: &CancellationToken,
        command: &str,
        target: &Target,
        sink: Arc<dyn OutputSink>,
        liveness_check: bool,
    ) -> Result<(), ExecError> {
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        if liveness_check {
            let latency = or_cancel(cancel, self.probe.probe(target)).await?;
            debug!(latency = ?latency, "liveness probe passed");
        }

        let connection = or_cancel(cancel, self.transport.connect(target)).await?;

        let mut handle = SessionHandle::new(connection);
        let result = handle.run(cancel, command, target, sink).await;
        handle.release().await;
        result
    }
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner").finish_non_exhaustive()
    }
}

/// Live resources of one execution
///
/// `release` closes the session, then the connection, at most once each.
struct SessionHandle {
    connection: Option<Box<dyn Connection>>,
    session: Option<Box<dyn RemoteSession>>,
}

impl SessionHandle {
    fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            connection: Some(connection),
            session: None,
        }
    }

    async fn run(
        &mut self,
        cancel: &CancellationToken,
        command: &str,
        target: &Target,
        sink: Arc<dyn OutputSink>,
    ) -> Result<(), ExecError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ExecError::Session("connection already released".to_string()));
        };

        let session = or_cancel(cancel, connection.open_session()).await?;
        let session = self.session.insert(session);

        // attach before executing so no leading output is lost
        let relay = session.take_output().map(|stream| {
            let host = target.name.clone();
            tokio::spawn(async move { sink.relay(&host, stream).await })
        });

        let result = tokio::select! {
            biased;
            res = session.execute(command) => res,
            () = cancel.cancelled() => {
                debug!("cancellation requested, closing session");
                Err(ExecError::Cancelled)
            }
        };

        // ends the output stream if the command did not
        self.release().await;

        if let Some(relay) = relay {
            match relay.await {
                Ok(Ok(bytes)) => debug!(bytes, "output relay finished"),
                Ok(Err(e)) => warn!(error = %e, "output relay failed"),
                Err(e) => warn!(error = %e, "output relay task aborted"),
            }
        }

        result
    }

    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }
}

async fn or_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, ExecError>>,
) -> Result<T, ExecError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExecError::Cancelled),
        res = fut => res,
    }
}
