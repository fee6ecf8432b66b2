//! Exec failure taxonomy.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Renders an argv as `[a, b, c]`.
pub(crate) fn render_command(command: &[String]) -> String {
    format!("[{}]", command.join(", "))
}

/// A command failed to start, exited non-zero, or ran past its deadline.
///
/// Every variant carries the original argv.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process or channel could not be launched, or I/O failed.
    #[error("Exec command {} failed to start", render_command(.command))]
    Start {
        /// The argv.
        command: Vec<String>,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("Exec command {} failed with status {status}. Output\n{output}", render_command(.command))]
    Status {
        /// The argv.
        command: Vec<String>,
        /// Exit status.
        status: i32,
        /// Captured combined output.
        output: String,
    },

    /// The command was terminated at its deadline.
    #[error("Exec command {} failed with timeout after {}s", render_command(.command), .timeout.as_secs_f64())]
    Timeout {
        /// The argv.
        command: Vec<String>,
        /// The deadline.
        timeout: Duration,
    },
}

impl ExecError {
    /// Creates a start failure.
    #[must_use]
    pub fn start(command: &[String], source: io::Error) -> Self {
        Self::Start {
            command: command.to_vec(),
            source,
        }
    }

    /// Creates a status failure.
    #[must_use]
    pub fn status(command: &[String], status: i32, output: impl Into<String>) -> Self {
        Self::Status {
            command: command.to_vec(),
            status,
            output: output.into(),
        }
    }

    /// Creates a timeout failure.
    #[must_use]
    pub fn timeout(command: &[String], timeout: Duration) -> Self {
        Self::Timeout {
            command: command.to_vec(),
            timeout,
        }
    }

    /// Returns the argv of the failed command.
    #[must_use]
    pub fn command(&self) -> &[String] {
        match self {
            Self::Start { command, .. }
            | Self::Status { command, .. }
            | Self::Timeout { command, .. } => command,
        }
    }

    /// Returns the exit status of a status failure.
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the captured output of a status failure.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Status { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Short kind name used when rendering a failure reason.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "StartFailure",
            Self::Status { .. } => "StatusFailure",
            Self::Timeout { .. } => "TimeoutFailure",
        }
    }

    /// Returns true for timeout failures.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
