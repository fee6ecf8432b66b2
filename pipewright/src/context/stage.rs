//! Per-execution stage context.

use super::LogSink;
use crate::config::{LocalExecConfig, RemoteExecConfig};
use crate::core::{LogLevel, TestReport};
use crate::errors::PipelineError;
use crate::exec::{CommandResult, Exec, ExecError, ExecTransport, LocalExec, RemoteExec};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Context handed to a stage handler.
///
/// A fresh context is built for every stage execution. It carries the
/// stage's identity, a copy of the pipeline version taken when the stage
/// started, and the values the handler sets for the engine to pick up
/// once the stage succeeds. Clones share the same state.
#[derive(Debug, Clone)]
pub struct StageContext {
    inner: Arc<StageInner>,
}

#[derive(Debug)]
struct StageInner {
    log: LogSink,
    local_exec: LocalExecConfig,
    state: Mutex<StageState>,
}

#[derive(Debug, Default)]
struct StageState {
    version: Option<String>,
    version_changed: bool,
    test_report: Option<TestReport>,
}

/// Values a finished stage hands back to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StageOutput {
    /// Version set by the handler, if it set one.
    pub version: Option<String>,
    /// Attached test report.
    pub test_report: Option<TestReport>,
}

impl StageContext {
    /// Creates a context logging through `log`.
    #[must_use]
    pub fn new(log: LogSink, version: Option<String>, local_exec: LocalExecConfig) -> Self {
        Self {
            inner: Arc::new(StageInner {
                log,
                local_exec,
                state: Mutex::new(StageState {
                    version,
                    ..StageState::default()
                }),
            }),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        self.inner.log.stage()
    }

    /// Returns the parallel group, if the stage runs in one.
    #[must_use]
    pub fn parallel(&self) -> Option<&str> {
        self.inner.log.parallel()
    }

    /// Returns the pipeline version as seen by this stage.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.inner.state.lock().version.clone()
    }

    /// Sets the pipeline version; it becomes visible to later stages only
    /// if this stage succeeds.
    pub fn set_version(&self, version: impl Into<String>) {
        let mut state = self.inner.state.lock();
        state.version = Some(version.into());
        state.version_changed = true;
    }

    /// Returns the attached test report.
    #[must_use]
    pub fn test_report(&self) -> Option<TestReport> {
        self.inner.state.lock().test_report.clone()
    }

    /// Attaches a test report to the stage's end event. Only one report
    /// may be attached per stage.
    pub fn set_test_report(&self, report: TestReport) -> Result<(), PipelineError> {
        let mut state = self.inner.state.lock();
        if state.test_report.is_some() {
            return Err(PipelineError::TestReportAlreadySet {
                stage: self.stage().to_string(),
            });
        }
        state.test_report = Some(report);
        Ok(())
    }

    pub(crate) fn output(&self) -> StageOutput {
        let mut state = self.inner.state.lock();
        StageOutput {
            version: if state.version_changed {
                state.version.clone()
            } else {
                None
            },
            test_report: state.test_report.take(),
        }
    }

    /// Returns the stage's log sink.
    #[must_use]
    pub fn log_sink(&self) -> &LogSink {
        &self.inner.log
    }

    /// Logs a message at `level`.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.inner.log.log(level, message);
    }

    /// Logs at TRACE.
    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    /// Logs at DEBUG.
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs at INFO.
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    /// Logs at WARN.
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    /// Logs at ERROR.
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    /// Masks `secret` in every later log message and failure reason.
    pub fn conceal(&self, secret: impl Into<String>) {
        self.inner.log.publisher().conceal(secret);
    }

    /// Returns a local exec backend attributed to this stage.
    #[must_use]
    pub fn local_exec(&self) -> LocalExec {
        LocalExec::new(self.inner.local_exec.clone(), self.inner.log.clone())
    }

    /// Returns a remote exec backend attributed to this stage.
    #[must_use]
    pub fn remote_exec(
        &self,
        transport: Arc<dyn ExecTransport>,
        config: RemoteExecConfig,
    ) -> RemoteExec {
        RemoteExec::new(transport, config, self.inner.log.clone())
    }

    /// Runs a command locally with the configured default deadline.
    pub async fn exec<I, S>(&self, command: I) -> Result<CommandResult, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = crate::exec::argv(command);
        self.local_exec().execute(&command, None).await
    }

    /// Runs a command locally with an explicit deadline.
    pub async fn exec_with_timeout<I, S>(
        &self,
        command: I,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = crate::exec::argv(command);
        self.local_exec().execute(&command, Some(timeout)).await
    }
}
