//! Lifecycle events and their JSON-lines wire form.

use crate::core::{Deployment, Link, LogLevel, TestReport};
use crate::utils::epoch_millis;
use serde::{Deserialize, Serialize};

/// Wire protocol version stamped on every record.
pub const API_VERSION: &str = "v1";

/// Job-level metadata update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobEvent {
    /// New display name for the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Links shown alongside the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

/// A stage is about to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStageEvent {
    /// Stage name.
    pub stage: String,
    /// Owning parallel group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<String>,
    /// Deployment descriptor for deployment stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

/// A log line attributed to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLogEvent {
    /// Stage name.
    pub stage: String,
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

/// A stage has finished; `reason` is set on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndStageEvent {
    /// Stage name.
    pub stage: String,
    /// Rendered failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Test report attached by the handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<TestReport>,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

/// Any lifecycle event, discriminated by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PipelineEvent {
    /// Job metadata update.
    #[serde(rename = "UpdateJobEvent")]
    UpdateJob(UpdateJobEvent),
    /// Stage start.
    #[serde(rename = "StartStageEvent")]
    StartStage(StartStageEvent),
    /// Stage log line.
    #[serde(rename = "StageLogEvent")]
    StageLog(StageLogEvent),
    /// Stage end.
    #[serde(rename = "EndStageEvent")]
    EndStage(EndStageEvent),
}

impl PipelineEvent {
    /// Creates a display-name update.
    #[must_use]
    pub fn rename(display_name: impl Into<String>) -> Self {
        Self::UpdateJob(UpdateJobEvent {
            display_name: Some(display_name.into()),
            links: None,
            timestamp: epoch_millis(),
        })
    }

    /// Creates a links update.
    #[must_use]
    pub fn links(links: Vec<Link>) -> Self {
        Self::UpdateJob(UpdateJobEvent {
            display_name: None,
            links: Some(links),
            timestamp: epoch_millis(),
        })
    }

    /// Creates a stage start event.
    #[must_use]
    pub fn start(
        stage: impl Into<String>,
        parallel: Option<String>,
        deployment: Option<Deployment>,
    ) -> Self {
        Self::StartStage(StartStageEvent {
            stage: stage.into(),
            parallel,
            deployment,
            timestamp: epoch_millis(),
        })
    }

    /// Creates a stage log event.
    #[must_use]
    pub fn log(stage: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self::StageLog(StageLogEvent {
            stage: stage.into(),
            level,
            message: message.into(),
            timestamp: epoch_millis(),
        })
    }

    /// Creates a stage end event.
    #[must_use]
    pub fn end(
        stage: impl Into<String>,
        reason: Option<String>,
        test_results: Option<TestReport>,
    ) -> Self {
        Self::EndStage(EndStageEvent {
            stage: stage.into(),
            reason,
            test_results,
            timestamp: epoch_millis(),
        })
    }

    /// Returns the wire discriminator.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpdateJob(_) => "UpdateJobEvent",
            Self::StartStage(_) => "StartStageEvent",
            Self::StageLog(_) => "StageLogEvent",
            Self::EndStage(_) => "EndStageEvent",
        }
    }

    /// Returns the stage the event belongs to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::UpdateJob(_) => None,
            Self::StartStage(e) => Some(&e.stage),
            Self::StageLog(e) => Some(&e.stage),
            Self::EndStage(e) => Some(&e.stage),
        }
    }

    /// Returns the creation timestamp in epoch milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::UpdateJob(e) => e.timestamp,
            Self::StartStage(e) => e.timestamp,
            Self::StageLog(e) => e.timestamp,
            Self::EndStage(e) => e.timestamp,
        }
    }
}

/// A versioned wire record wrapping one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Always [`API_VERSION`].
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    /// The event.
    #[serde(flatten)]
    pub event: PipelineEvent,
}

impl EventRecord {
    /// Wraps an event with the current API version.
    #[must_use]
    pub fn new(event: PipelineEvent) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            event,
        }
    }

    /// Serializes to a single JSON line, without the trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses one JSON line.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }
}

impl From<PipelineEvent> for EventRecord {
    fn from(event: PipelineEvent) -> Self {
        Self::new(event)
    }
}
