//! Assertions over collected events.

use crate::core::{Deployment, LogLevel};
use crate::events::{EndStageEvent, PipelineEvent, StartStageEvent};

/// Asserts that `event` starts `stage` with the given group and deployment.
pub fn assert_start_event(
    event: &PipelineEvent,
    stage: &str,
    parallel: Option<&str>,
    deployment: Option<&Deployment>,
) -> StartStageEvent {
    match event {
        PipelineEvent::StartStage(start) => {
            assert_eq!(start.stage, stage, "Unexpected stage in {start:?}");
            assert_eq!(start.parallel.as_deref(), parallel, "Unexpected group in {start:?}");
            assert_eq!(start.deployment.as_ref(), deployment, "Unexpected deployment in {start:?}");
            start.clone()
        }
        other => panic!("Expected StartStageEvent for '{stage}', got {other:?}"),
    }
}

/// Asserts that `event` is a log line of `stage`.
pub fn assert_log_event(event: &PipelineEvent, stage: &str, level: LogLevel, message: &str) {
    match event {
        PipelineEvent::StageLog(log) => {
            assert_eq!(log.stage, stage, "Unexpected stage in {log:?}");
            assert_eq!(log.level, level, "Unexpected level in {log:?}");
            assert_eq!(log.message, message, "Unexpected message in {log:?}");
        }
        other => panic!("Expected StageLogEvent for '{stage}', got {other:?}"),
    }
}

/// Asserts that `event` ends `stage`, successfully unless `failed`.
pub fn assert_end_event(event: &PipelineEvent, stage: &str, failed: bool) -> EndStageEvent {
    match event {
        PipelineEvent::EndStage(end) => {
            assert_eq!(end.stage, stage, "Unexpected stage in {end:?}");
            assert_eq!(
                end.reason.is_some(),
                failed,
                "Expected failed={failed} for '{stage}', got reason {:?}",
                end.reason
            );
            end.clone()
        }
        other => panic!("Expected EndStageEvent for '{stage}', got {other:?}"),
    }
}

/// Summarizes events as `(kind, stage)` pairs for sequence comparisons.
#[must_use]
pub fn stage_sequence(events: &[PipelineEvent]) -> Vec<(&'static str, String)> {
    events
        .iter()
        .map(|e| (e.kind(), e.stage().unwrap_or_default().to_string()))
        .collect()
}
