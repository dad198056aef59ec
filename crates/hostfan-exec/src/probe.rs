//! TCP liveness probe

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::error::ExecError;
use crate::target::Target;
use crate::traits::LivenessProbe;

/// Checks that the target's SSH port accepts TCP connections
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe that gives up after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl LivenessProbe for TcpProbe {
    #[instrument(skip(self, target), fields(host = %target.name))]
    async fn probe(&self, target: &Target) -> Result<Duration, ExecError> {
        let start = Instant::now();
        let addr = (target.addr.as_str(), target.port);

        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                let latency = start.elapsed();
                debug!(latency = ?latency, "host reachable");
                Ok(latency)
            }
            Ok(Err(e)) => Err(ExecError::Connection(format!(
                "{}:{} unreachable: {e}",
                target.addr, target.port
            ))),
            Err(_) => Err(ExecError::Connection(format!(
                "{}:{} unreachable: timed out after {:?}",
                target.addr, target.port, self.timeout
            ))),
        }
    }
}
