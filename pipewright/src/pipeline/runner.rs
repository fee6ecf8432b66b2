//! The per-stage execution boundary.

use crate::config::PipelineConfig;
use crate::context::{LogSink, StageContext};
use crate::errors::HandlerFailure;
use crate::events::PipelineEvent;
use crate::observability::SpanTimer;
use crate::stages::StageHandler;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// What the orchestrator needs to know after a stage ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageOutcome {
    pub success: bool,
    /// Version to write back; only set for successful stages.
    pub version: Option<String>,
}

/// Runs one handler to completion and writes its end event.
///
/// The start event must already have been published. The handler runs on
/// its own task, so errors and panics alike stop here and come back as a
/// failed outcome.
pub(crate) async fn run_stage(
    handler: Arc<dyn StageHandler>,
    log: LogSink,
    version: Option<String>,
    config: Arc<PipelineConfig>,
) -> StageOutcome {
    let ctx = StageContext::new(log.clone(), version, config.local_exec.clone());
    let timer = SpanTimer::start(log.stage());
    let span = info_span!("stage", stage = %log.stage(), parallel = log.parallel().unwrap_or(""));

    let task_ctx = ctx.clone();
    let joined = tokio::spawn(async move { handler.run(&task_ctx).await }.instrument(span)).await;
    let failure = match joined {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(HandlerFailure::from_error(&err)),
        Err(err) if err.is_panic() => Some(HandlerFailure::from_panic(err.into_panic().as_ref())),
        Err(err) => Some(HandlerFailure::new("Cancelled", err.to_string())),
    };

    let output = ctx.output();
    let duration_ms = timer.finish();
    let reason = failure.as_ref().map(|failure| {
        log.publisher()
            .sanitize(&failure.render(config.render_cause_chain))
    });
    match &reason {
        None => info!(stage = %log.stage(), duration_ms, "Stage succeeded"),
        Some(reason) => warn!(stage = %log.stage(), duration_ms, reason = %reason, "Stage failed"),
    }

    let success = reason.is_none();
    log.close(PipelineEvent::end(log.stage(), reason, output.test_report));
    StageOutcome {
        success,
        version: if success { output.version } else { None },
    }
}
