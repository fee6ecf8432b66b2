//! Configuration for the engine, exec backends and diagnostics logging.

use crate::core::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Append `Caused by:` lines to failure reasons.
    #[serde(default = "default_render_cause_chain")]
    pub render_cause_chain: bool,
    /// Settings for `StageContext::exec`.
    #[serde(default)]
    pub local_exec: LocalExecConfig,
    /// Diagnostics logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_render_cause_chain() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_cause_chain: default_render_cause_chain(),
            local_exec: LocalExecConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `PIPEWRIGHT_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and
    /// ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup("PIPEWRIGHT_WORKDIR") {
            config.local_exec.working_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("PIPEWRIGHT_EXEC_LEVEL") {
            match level.parse::<LogLevel>() {
                Ok(level) => config.local_exec.level = level,
                Err(err) => warn!(error = %err, "Ignoring PIPEWRIGHT_EXEC_LEVEL"),
            }
        }
        if let Some(timeout) = lookup("PIPEWRIGHT_EXEC_TIMEOUT_SECONDS") {
            match timeout.trim().parse::<f64>() {
                Ok(seconds) if seconds > 0.0 && seconds.is_finite() => {
                    config.local_exec.default_timeout_seconds = Some(seconds);
                }
                _ => warn!(value = %timeout, "Ignoring PIPEWRIGHT_EXEC_TIMEOUT_SECONDS"),
            }
        }
        if let Some(render) = lookup("PIPEWRIGHT_RENDER_CAUSES") {
            match parse_bool(&render) {
                Some(render) => config.render_cause_chain = render,
                None => warn!(value = %render, "Ignoring PIPEWRIGHT_RENDER_CAUSES"),
            }
        }
        if let Some(format) = lookup("PIPEWRIGHT_LOG_FORMAT") {
            config.logging.json = format.trim().eq_ignore_ascii_case("json");
        }
        config
    }

    /// Sets whether cause chains are rendered.
    #[must_use]
    pub fn with_render_cause_chain(mut self, render: bool) -> Self {
        self.render_cause_chain = render;
        self
    }

    /// Sets the local exec configuration.
    #[must_use]
    pub fn with_local_exec(mut self, local_exec: LocalExecConfig) -> Self {
        self.local_exec = local_exec;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Local process execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalExecConfig {
    /// Directory commands run in.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Severity for captured output lines.
    #[serde(default)]
    pub level: LogLevel,
    /// Deadline used when a call does not pass one.
    #[serde(default)]
    pub default_timeout_seconds: Option<f64>,
}

fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Default for LocalExecConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            level: LogLevel::default(),
            default_timeout_seconds: None,
        }
    }
}

impl LocalExecConfig {
    /// Creates a configuration rooted at `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the output severity.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the default deadline.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_seconds = Some(timeout.as_secs_f64());
        self
    }

    /// Returns the default deadline.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_seconds.and_then(seconds_to_duration)
    }
}

/// In-container execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteExecConfig {
    /// Namespace of the pod.
    pub namespace: String,
    /// Pod name.
    pub pod: String,
    /// Container name; the pod's default container when unset.
    #[serde(default)]
    pub container: Option<String>,
    /// Severity for captured output lines.
    #[serde(default)]
    pub level: LogLevel,
    /// Deadline used when a call does not pass one.
    #[serde(default = "default_remote_timeout")]
    pub default_timeout_seconds: f64,
}

fn default_remote_timeout() -> f64 {
    300.0
}

impl RemoteExecConfig {
    /// Creates a configuration targeting a pod's default container.
    #[must_use]
    pub fn new(namespace: impl Into<String>, pod: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container: None,
            level: LogLevel::default(),
            default_timeout_seconds: default_remote_timeout(),
        }
    }

    /// Targets a named container.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Sets the output severity.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the default deadline.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_seconds = timeout.as_secs_f64();
        self
    }

    /// Returns the default deadline.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        seconds_to_duration(self.default_timeout_seconds)
    }
}

fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|d| !d.is_zero())
}

/// Diagnostics logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON-formatted diagnostics.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}
