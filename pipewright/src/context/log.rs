//! Stage-attributed log output.

use crate::core::LogLevel;
use crate::events::{EventPublisher, PipelineEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Snapshot of a stage's logging context.
///
/// A sink is created before its stage starts and passed explicitly to
/// everything that logs on the stage's behalf, including exec backends.
/// Clones share the same destination. Once the stage's end event has been
/// written the sink drops further messages.
#[derive(Debug, Clone)]
pub struct LogSink {
    publisher: EventPublisher,
    stage: Arc<str>,
    parallel: Option<Arc<str>>,
    buffered: bool,
    pending: Arc<Mutex<Vec<PipelineEvent>>>,
    closed: Arc<AtomicBool>,
}

impl LogSink {
    /// Creates a sink publishing directly for `stage`.
    #[must_use]
    pub fn new(publisher: EventPublisher, stage: impl Into<String>) -> Self {
        Self {
            publisher,
            stage: Arc::from(stage.into()),
            parallel: None,
            buffered: false,
            pending: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Tags the sink with its parallel group.
    #[must_use]
    pub fn with_parallel(mut self, group: impl Into<String>) -> Self {
        self.parallel = Some(Arc::from(group.into()));
        self
    }

    /// Holds events back until [`LogSink::close`], so a parallel member's
    /// output reaches the stream as one uninterrupted run.
    #[must_use]
    pub(crate) fn buffered(mut self) -> Self {
        self.buffered = true;
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns the parallel group name.
    #[must_use]
    pub fn parallel(&self) -> Option<&str> {
        self.parallel.as_deref()
    }

    /// Returns true once the stage has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Logs a message for the stage.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let message = self.publisher.sanitize(message.as_ref());
        let event = PipelineEvent::log(&*self.stage, level, message);
        // Held across the closed check and the write so nothing lands after the end event.
        let mut pending = self.pending.lock();
        if self.is_closed() {
            debug!(stage = %self.stage, "Dropping log after stage end");
            return;
        }
        if self.buffered {
            pending.push(event);
        } else {
            self.publisher.publish(event);
        }
    }

    /// Writes any held-back logs followed by the stage's end event.
    pub(crate) fn close(&self, end: PipelineEvent) {
        let mut pending = self.pending.lock();
        self.closed.store(true, Ordering::SeqCst);
        let mut events: Vec<PipelineEvent> = pending.drain(..).collect();
        events.push(end);
        self.publisher.publish_all(events);
    }
}
