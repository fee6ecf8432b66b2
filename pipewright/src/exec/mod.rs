//! Command execution behind one contract with two backends.
//!
//! [`LocalExec`] spawns an OS process; [`RemoteExec`] opens an exec channel
//! into a running container. Both report results and failures the same
//! way, so handlers never need to know which one they are talking to.

mod capture;
mod error;
mod local;
pub mod remote;

pub use capture::{LineBuffer, LogCapture};
pub use error::ExecError;
pub use local::LocalExec;
pub use remote::{ContainerTarget, ExecChannel, ExecTransport, RemoteExec};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output of a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status, 0 on success.
    pub status: i32,
    /// Captured combined output, one line per captured line.
    pub data: String,
}

impl CommandResult {
    /// Creates a result.
    #[must_use]
    pub fn new(status: i32, data: impl Into<String>) -> Self {
        Self {
            status,
            data: data.into(),
        }
    }
}

/// Runs a command to completion.
#[async_trait]
pub trait Exec: Send + Sync {
    /// Executes `command` and waits for it, failing on a non-zero exit or
    /// when `timeout` elapses. A `None` timeout falls back to the backend's
    /// configured default.
    async fn execute(
        &self,
        command: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandResult, ExecError>;
}

/// Builds an owned argument vector.
///
/// ```
/// let command = pipewright::exec::argv(["git", "status"]);
/// assert_eq!(command, vec!["git".to_string(), "status".to_string()]);
/// ```
pub fn argv<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}
