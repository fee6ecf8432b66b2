//! Mock handlers and a scripted exec transport.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::context::StageContext;
use crate::errors::PipelineError;
use crate::exec::remote::ChannelFrame;
use crate::exec::{ContainerTarget, ExecChannel, ExecTransport};
use crate::stages::StageHandler;

/// A handler that records every stage it runs for.
///
/// Clones share their records, so a clone can be handed to the pipeline
/// while the original is inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<AtomicUsize>,
    stages: Arc<Mutex<Vec<String>>>,
}

impl RecordingHandler {
    /// Creates a new recording handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times the handler ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the stage names the handler ran for.
    #[must_use]
    pub fn stages(&self) -> Vec<String> {
        self.stages.lock().clone()
    }
}

#[async_trait]
impl StageHandler for RecordingHandler {
    async fn run(&self, ctx: &StageContext) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.stages.lock().push(ctx.stage().to_string());
        Ok(())
    }
}

/// A handler that always fails with a message.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    /// Creates a failing handler.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl StageHandler for FailingHandler {
    async fn run(&self, _ctx: &StageContext) -> anyhow::Result<()> {
        Err(PipelineError::fail(&self.message).into())
    }
}

/// A handler that logs, sleeps, logs again, then succeeds.
#[derive(Debug, Clone)]
pub struct SlowHandler {
    delay: Duration,
}

impl SlowHandler {
    /// Creates a slow handler.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl StageHandler for SlowHandler {
    async fn run(&self, ctx: &StageContext) -> anyhow::Result<()> {
        ctx.info(format!("{} starting", ctx.stage()));
        tokio::time::sleep(self.delay).await;
        ctx.info(format!("{} done", ctx.stage()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Step {
    Frame(Vec<u8>),
    Error(String),
    Hang,
}

/// A channel replaying a fixed script of frames.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    closed: Arc<AtomicBool>,
}

impl ScriptedChannel {
    /// Creates an empty script; the channel closes immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stdout chunk.
    #[must_use]
    pub fn stdout(self, chunk: &str) -> Self {
        self.frame(ChannelFrame::STDOUT, chunk)
    }

    /// Appends a stderr chunk.
    #[must_use]
    pub fn stderr(self, chunk: &str) -> Self {
        self.frame(ChannelFrame::STDERR, chunk)
    }

    /// Appends a status payload chunk.
    #[must_use]
    pub fn status(self, payload: &str) -> Self {
        self.frame(ChannelFrame::STATUS, payload)
    }

    /// Appends a raw frame on any stream.
    #[must_use]
    pub fn frame(mut self, stream: u8, payload: &str) -> Self {
        self.steps
            .push_back(Step::Frame(ChannelFrame::encode(stream, payload.as_bytes())));
        self
    }

    /// Fails the read at this point.
    #[must_use]
    pub fn error(mut self, message: &str) -> Self {
        self.steps.push_back(Step::Error(message.to_string()));
        self
    }

    /// Never delivers another frame.
    #[must_use]
    pub fn hang(mut self) -> Self {
        self.steps.push_back(Step::Hang);
        self
    }

    /// Returns a flag set once the channel is closed.
    #[must_use]
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

#[async_trait]
impl ExecChannel for ScriptedChannel {
    async fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(Step::Frame(raw)) => Ok(Some(raw)),
            Some(Step::Error(message)) => Err(io::Error::other(message)),
            Some(Step::Hang) => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A transport handing out copies of one scripted channel.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Result<ScriptedChannel, String>,
    opened: Mutex<Vec<(ContainerTarget, Vec<String>)>>,
}

impl ScriptedTransport {
    /// Creates a transport replaying `channel` for every command.
    #[must_use]
    pub fn new(channel: ScriptedChannel) -> Self {
        Self {
            script: Ok(channel),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Creates a transport whose channels never open.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Err(message.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Returns every `(target, command)` an open was attempted for.
    #[must_use]
    pub fn opened(&self) -> Vec<(ContainerTarget, Vec<String>)> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl ExecTransport for ScriptedTransport {
    async fn open(
        &self,
        target: &ContainerTarget,
        command: &[String],
    ) -> io::Result<Box<dyn ExecChannel>> {
        self.opened.lock().push((target.clone(), command.to_vec()));
        match &self.script {
            Ok(channel) => Ok(Box::new(channel.clone())),
            Err(message) => Err(io::Error::new(io::ErrorKind::ConnectionRefused, message.clone())),
        }
    }
}
