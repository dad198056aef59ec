//! SSH transport using russh crate

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use russh::{ChannelMsg, Disconnect, client};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecError;
use crate::target::Target;
use crate::traits::{Connection, OutputStream, RemoteSession, Transport};

/// Buffer between the channel reader and the output relay
const PIPE_CAPACITY: usize = 64 * 1024;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Accept all server keys (like StrictHostKeyChecking=no)
        Ok(true)
    }
}

/// Opens SSH connections to targets
#[derive(Debug, Clone)]
pub struct SshTransport {
    connect_timeout: Duration,
}

impl SshTransport {
    /// Create a transport that gives up connecting after `connect_timeout`
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Try key then password authentication
    async fn authenticate(
        handle: &mut client::Handle<SshClientHandler>,
        target: &Target,
    ) -> Result<(), ExecError> {
        if let Some(source) = target.key_source() {
            let key = source.resolve().map_err(|e| ExecError::Key(e.to_string()))?;
            let key_pair =
                load_secret_key(key.path(), None).map_err(|e| ExecError::Key(e.to_string()))?;

            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .ok()
                .flatten()
                .flatten();
            let auth_res = handle
                .authenticate_publickey(
                    &target.user,
                    PrivateKeyWithHashAlg::new(Arc::new(key_pair), hash_alg),
                )
                .await
                .map_err(|e| ExecError::Connection(e.to_string()))?;

            if auth_res.success() {
                return Ok(());
            }
            debug!(host = %target.name, "public key rejected");
        }

        if let Some(password) = &target.password {
            let auth_res = handle
                .authenticate_password(&target.user, password)
                .await
                .map_err(|e| ExecError::Connection(e.to_string()))?;

            if auth_res.success() {
                return Ok(());
            }
            debug!(host = %target.name, "password rejected");
        }

        if target.key_source().is_none() && target.password.is_none() {
            return Err(ExecError::Connection(
                "no authentication method configured".to_string(),
            ));
        }

        Err(ExecError::Connection(format!(
            "authentication failed for {}",
            target.user
        )))
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Transport for SshTransport {
    #[instrument(skip(self, target), fields(host = %target.name))]
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, ExecError> {
        info!(
            addr = %target.addr,
            port = target.port,
            user = %target.user,
            "connecting to SSH"
        );

        let config = Arc::new(client::Config::default());
        let connect = client::connect(config, (target.addr.as_str(), target.port), SshClientHandler);

        let mut handle = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                ExecError::Connection(format!("timed out after {:?}", self.connect_timeout))
            })?
            .map_err(|e| ExecError::Connection(e.to_string()))?;

        if let Err(e) = Self::authenticate(&mut handle, target).await {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await;
            return Err(e);
        }

        info!("SSH connected and authenticated");

        Ok(Box::new(SshConnection {
            host: target.name.clone(),
            handle: Some(handle),
        }))
    }
}

/// Authenticated SSH connection
pub struct SshConnection {
    host: String,
    handle: Option<client::Handle<SshClientHandler>>,
}

#[async_trait]
impl Connection for SshConnection {
    async fn open_session(&mut self) -> Result<Box<dyn RemoteSession>, ExecError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| ExecError::Session("connection closed".to_string()))?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ExecError::Session(e.to_string()))?;

        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

        debug!(host = %self.host, "session opened");

        Ok(Box::new(SshSession {
            host: self.host.clone(),
            channel: Some(channel),
            writer: Some(writer),
            reader: Some(reader),
        }))
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                debug!(host = %self.host, error = %e, "disconnect failed");
            }
            info!(host = %self.host, "SSH disconnected");
        }
    }
}

/// Session channel with its output piped into an in-memory stream
pub struct SshSession {
    host: String,
    channel: Option<russh::Channel<client::Msg>>,
    writer: Option<DuplexStream>,
    reader: Option<DuplexStream>,
}

impl SshSession {
    async fn forward(&mut self, data: &[u8]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_all(data).await {
            // relay went away; keep draining the channel so the command can finish
            warn!(host = %self.host, error = %e, "dropping session output");
            self.writer = None;
        }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    fn take_output(&mut self) -> Option<OutputStream> {
        self.reader
            .take()
            .map(|reader| Box::new(reader) as OutputStream)
    }

    #[instrument(skip(self, command), fields(host = %self.host))]
    async fn execute(&mut self, command: &str) -> Result<(), ExecError> {
        let mut channel = self
            .channel
            .take()
            .ok_or_else(|| ExecError::Exec("session closed".to_string()))?;

        debug!(command = %command, "executing remote command");

        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::Exec(e.to_string()))?;

        let mut status = None;
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => self.forward(&data).await,
                // stderr shares the stream, as it would on a terminal
                Some(ChannelMsg::ExtendedData { data, ext: 1 }) => self.forward(&data).await,
                Some(ChannelMsg::ExitStatus { exit_status }) => status = Some(exit_status),
                Some(ChannelMsg::Close) | None => break,
                _ => {}
            }
        }

        // end-of-stream for the relay
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }

        debug!(status = ?status, "remote command completed");

        match status {
            Some(0) => Ok(()),
            Some(status) => Err(ExecError::CommandFailed { status }),
            None => Err(ExecError::Exec(
                "channel closed without exit status".to_string(),
            )),
        }
    }

    async fn close(&mut self) {
        self.writer = None;
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!(host = %self.host, error = %e, "channel close failed");
            }
        }
    }
}
