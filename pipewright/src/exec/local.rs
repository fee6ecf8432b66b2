//! Local process execution.

use super::capture::LogCapture;
use super::error::render_command;
use super::{CommandResult, Exec, ExecError};
use crate::config::LocalExecConfig;
use crate::context::LogSink;
use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

/// Runs commands as child processes of the current one.
///
/// Standard error is merged into the captured output and every line is
/// logged to the owning stage while the process runs.
#[derive(Debug, Clone)]
pub struct LocalExec {
    config: LocalExecConfig,
    log: LogSink,
}

impl LocalExec {
    /// Creates a backend logging to `log`.
    #[must_use]
    pub fn new(config: LocalExecConfig, log: LogSink) -> Self {
        Self { config, log }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LocalExecConfig {
        &self.config
    }
}

#[async_trait]
impl Exec for LocalExec {
    async fn execute(
        &self,
        command: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, ExecError> {
        let Some((program, args)) = command.split_first() else {
            return Err(ExecError::start(
                command,
                io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
            ));
        };
        let timeout = timeout.or_else(|| self.config.default_timeout());
        debug!(
            command = %render_command(command),
            working_dir = %self.config.working_dir.display(),
            stage = self.log.stage(),
            "Running command"
        );

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ExecError::start(command, err))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ExecError::start(
                command,
                io::Error::other("output pipes unavailable"),
            ));
        };

        let mut capture = LogCapture::new(self.log.clone(), self.config.level);
        let run = pump(&mut child, stdout, stderr, &mut capture);
        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(status) => status,
                Err(_) => {
                    if let Err(err) = child.kill().await {
                        warn!(command = %render_command(command), error = %err, "Failed to kill timed out process");
                    }
                    return Err(ExecError::timeout(command, limit));
                }
            },
            None => run.await,
        }
        .map_err(|err| ExecError::start(command, err))?;

        let code = exit_code(status);
        if code == 0 {
            Ok(CommandResult::new(code, capture.text()))
        } else {
            Err(ExecError::status(command, code, capture.text()))
        }
    }
}

async fn pump(
    child: &mut Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    capture: &mut LogCapture,
) -> io::Result<ExitStatus> {
    let mut out = BufReader::new(stdout);
    let mut err = BufReader::new(stderr);
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            read = out.read_until(b'\n', &mut out_buf), if out_open => {
                if read? == 0 {
                    out_open = false;
                } else {
                    capture.line(&out_buf);
                    out_buf.clear();
                }
            }
            read = err.read_until(b'\n', &mut err_buf), if err_open => {
                if read? == 0 {
                    err_open = false;
                } else {
                    capture.line(&err_buf);
                    err_buf.clear();
                }
            }
        }
    }

    child.wait().await
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use crate::events::{CollectingEventSink, EventPublisher, PipelineEvent};
    use crate::exec::argv;
    use std::sync::Arc;
    use std::time::Instant;

    fn backend(dir: &std::path::Path) -> (Arc<CollectingEventSink>, LocalExec) {
        let events = Arc::new(CollectingEventSink::new());
        let log = LogSink::new(EventPublisher::new(events.clone()), "Build");
        let config = LocalExecConfig::new(dir).with_level(LogLevel::Info);
        (events, LocalExec::new(config, log))
    }

    fn messages(events: &CollectingEventSink) -> Vec<String> {
        events
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::StageLog(log) => Some(log.message),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_echo_captures_lines() {
        let dir = tempfile::tempdir().unwrap();
        let (events, exec) = backend(dir.path());
        let result = exec
            .execute(&argv(["printf", "Hello\\nworld\\n"]), None)
            .await
            .unwrap();
        assert_eq!(result.status, 0);
        assert_eq!(result.data, "Hello\nworld");
        assert_eq!(messages(&events), ["Hello", "world"]);
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let (_, exec) = backend(dir.path());
        let result = exec.execute(&argv(["ls"]), None).await.unwrap();
        assert_eq!(result.data, "marker.txt");
    }

    #[tokio::test]
    async fn test_stderr_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let (_, exec) = backend(dir.path());
        let result = exec
            .execute(&argv(["sh", "-c", "echo oops 1>&2"]), None)
            .await
            .unwrap();
        assert_eq!(result.data, "oops");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (_, exec) = backend(dir.path());
        let err = exec
            .execute(&argv(["sh", "-c", "echo partial; exit 3"]), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "StatusFailure");
        assert_eq!(err.exit_status(), Some(3));
        assert_eq!(err.output(), Some("partial"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let (_, exec) = backend(dir.path());
        let err = exec
            .execute(&argv(["definitely-not-a-real-binary-4242"]), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "StartFailure");
    }

    #[tokio::test]
    async fn test_empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let (_, exec) = backend(dir.path());
        let err = exec.execute(&[], None).await.unwrap_err();
        assert_eq!(err.kind(), "StartFailure");
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let (events, exec) = backend(dir.path());
        let started = Instant::now();
        let err = exec
            .execute(
                &argv(["sh", "-c", "echo before; sleep 3; echo after"]),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timeout after 1s"));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(messages(&events), ["before"]);
    }

    #[tokio::test]
    async fn test_default_timeout_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(CollectingEventSink::new());
        let log = LogSink::new(EventPublisher::new(events), "Build");
        let config = LocalExecConfig::new(dir.path()).with_default_timeout(Duration::from_millis(200));
        let exec = LocalExec::new(config, log);
        let err = exec.execute(&argv(["sleep", "2"]), None).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
