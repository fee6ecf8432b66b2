//! Error types for the pipewright engine.
//!
//! Handler errors travel as [`anyhow::Error`]; the engine turns them into a
//! [`HandlerFailure`] at the stage boundary so they can be rendered into the
//! end event's reason.

use crate::exec::ExecError;
use std::any::Any;
use thiserror::Error;

/// Errors raised by the engine itself or by handlers through the engine API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A user-requested failure.
    #[error("{0}")]
    Fail(String),

    /// Parallel deploy and rollback groups carry different key sets.
    #[error(
        "Parallel rollback ({rollbacks}) must contain the same keys as parallel deployment ({deployments})"
    )]
    RollbackKeyMismatch {
        /// Rendered deployment keys, e.g. `[eu, us]`.
        deployments: String,
        /// Rendered rollback keys.
        rollbacks: String,
    },

    /// A stage tried to attach a second test report.
    #[error("Test report already set for stage '{stage}'")]
    TestReportAlreadySet {
        /// Stage name.
        stage: String,
    },

    /// The version provider could not resolve an initial version.
    #[error("Version provider failed: {0}")]
    VersionProvider(String),
}

impl PipelineError {
    /// Creates a user failure.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    /// Creates a key-mismatch error from the two key sets.
    #[must_use]
    pub fn rollback_key_mismatch<D, R>(deployments: D, rollbacks: R) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self::RollbackKeyMismatch {
            deployments: render_keys(deployments),
            rollbacks: render_keys(rollbacks),
        }
    }

    /// Short kind name used when rendering a failure reason.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fail(_) => "Failure",
            Self::RollbackKeyMismatch { .. } | Self::VersionProvider(_) => "ConfigurationFailure",
            Self::TestReportAlreadySet { .. } => "IllegalState",
        }
    }
}

/// Renders a key set as `[a, b]`, sorted.
fn render_keys<I>(keys: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
    keys.sort();
    format!("[{}]", keys.join(", "))
}

/// A handler failure captured at the stage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Short error kind, e.g. `TimeoutFailure` or `Panic`.
    pub kind: String,
    /// Top-level message.
    pub message: String,
    /// Messages of the underlying causes, outermost first.
    pub causes: Vec<String>,
}

impl HandlerFailure {
    /// Creates a failure without causes.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Captures an error returned by a handler.
    #[must_use]
    pub fn from_error(error: &anyhow::Error) -> Self {
        let kind = if let Some(err) = error.downcast_ref::<PipelineError>() {
            err.kind()
        } else if let Some(err) = error.downcast_ref::<ExecError>() {
            err.kind()
        } else {
            "Error"
        };
        Self {
            kind: kind.to_string(),
            message: error.to_string(),
            causes: error.chain().skip(1).map(ToString::to_string).collect(),
        }
    }

    /// Captures a panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new("Panic", message)
    }

    /// Renders the failure as a reason string.
    #[must_use]
    pub fn render(&self, with_causes: bool) -> String {
        let mut reason = format!("{}: {}", self.kind, self.message);
        if with_causes {
            for cause in &self.causes {
                reason.push_str("\nCaused by: ");
                reason.push_str(cause);
            }
        }
        reason
    }
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
