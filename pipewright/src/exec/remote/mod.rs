//! In-container execution over a multiplexed exec channel.
//!
//! The transport that actually reaches the cluster is injected through
//! [`ExecTransport`]; this module owns framing, log capture, deadlines and
//! the mapping of the terminal status payload to an exit code.

mod frame;

pub use frame::{ChannelFrame, ExecStatus, StatusCause, StatusDetails};

use super::capture::{LineBuffer, LogCapture};
use super::error::render_command;
use super::{CommandResult, Exec, ExecError};
use crate::config::RemoteExecConfig;
use crate::context::LogSink;
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// The container a command runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTarget {
    /// Namespace of the pod.
    pub namespace: String,
    /// Pod name.
    pub pod: String,
    /// Container name; the pod's default container when unset.
    pub container: Option<String>,
}

impl From<&RemoteExecConfig> for ContainerTarget {
    fn from(config: &RemoteExecConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            pod: config.pod.clone(),
            container: config.container.clone(),
        }
    }
}

/// Opens exec channels into containers.
#[async_trait]
pub trait ExecTransport: Send + Sync {
    /// Starts `command` in `target` and returns its channel.
    async fn open(
        &self,
        target: &ContainerTarget,
        command: &[String],
    ) -> io::Result<Box<dyn ExecChannel>>;
}

/// A bidirectional exec channel delivering raw frames.
#[async_trait]
pub trait ExecChannel: Send {
    /// Returns the next raw frame, or `None` once the channel has closed.
    async fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Closes the channel, terminating the remote command if still running.
    async fn close(&mut self);
}

/// Runs commands inside a container through an [`ExecTransport`].
#[derive(Clone)]
pub struct RemoteExec {
    transport: Arc<dyn ExecTransport>,
    config: RemoteExecConfig,
    log: LogSink,
}

impl RemoteExec {
    /// Creates a backend logging to `log`.
    #[must_use]
    pub fn new(transport: Arc<dyn ExecTransport>, config: RemoteExecConfig, log: LogSink) -> Self {
        Self {
            transport,
            config,
            log,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RemoteExecConfig {
        &self.config
    }
}

impl std::fmt::Debug for RemoteExec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExec")
            .field("config", &self.config)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Exec for RemoteExec {
    async fn execute(
        &self,
        command: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, ExecError> {
        if command.is_empty() {
            return Err(ExecError::start(
                command,
                io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
            ));
        }
        let timeout = timeout.or_else(|| self.config.default_timeout());
        debug!(
            "Running command: {} on pod {} in namespace {}",
            render_command(command),
            self.config.pod,
            self.config.namespace
        );

        let target = ContainerTarget::from(&self.config);
        let mut channel = self
            .transport
            .open(&target, command)
            .await
            .map_err(|err| ExecError::start(command, err))?;

        let mut capture = LogCapture::new(self.log.clone(), self.config.level);
        let mut status = Vec::new();
        let run = pump(channel.as_mut(), &mut capture, &mut status);
        let pumped = match timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(pumped) => pumped,
                Err(_) => {
                    channel.close().await;
                    return Err(ExecError::timeout(command, limit));
                }
            },
            None => run.await,
        };
        channel.close().await;
        pumped.map_err(|err| ExecError::start(command, err))?;

        let code = exit_code(&String::from_utf8_lossy(&status));
        if code == 0 {
            Ok(CommandResult::new(code, capture.text()))
        } else {
            Err(ExecError::status(command, code, capture.text()))
        }
    }
}

async fn pump(
    channel: &mut dyn ExecChannel,
    capture: &mut LogCapture,
    status: &mut Vec<u8>,
) -> io::Result<()> {
    let mut stdout = LineBuffer::new();
    let mut stderr = LineBuffer::new();
    while let Some(raw) = channel.next_frame().await? {
        match ChannelFrame::decode(&raw) {
            Some(ChannelFrame::Stdout(chunk)) => stdout.push(chunk, capture),
            Some(ChannelFrame::Stderr(chunk)) => stderr.push(chunk, capture),
            Some(ChannelFrame::Status(chunk)) => status.extend_from_slice(chunk),
            Some(ChannelFrame::Other(_)) | None => {}
        }
    }
    stdout.flush(capture);
    stderr.flush(capture);
    Ok(())
}

fn exit_code(raw: &str) -> i32 {
    debug!("Raw status: {}", raw);
    match ExecStatus::parse(raw) {
        Ok(status) => status.exit_code(),
        Err(err) => {
            error!(status = %raw, error = %err, "Failed to parse exec status");
            1
        }
    }
}
