//! Event sink trait and implementations.

use super::{EventRecord, PipelineEvent};
use parking_lot::{Mutex, RwLock};
use std::io::Write;
use tracing::{debug, info, warn, Level};

/// Destination for lifecycle events.
///
/// Sinks are write-and-forget: they must not block on a consumer and must
/// never fail the pipeline. Delivery problems are logged and dropped.
pub trait EventSink: Send + Sync {
    /// Emits one event.
    fn emit(&self, event: &PipelineEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        let kind = event.kind();
        let stage = event.stage().unwrap_or("");
        if self.level == Level::DEBUG {
            debug!(kind, stage, event = ?event, "Event: {}", kind);
        } else {
            info!(kind, stage, event = ?event, "Event: {}", kind);
        }
    }
}

/// Writes each event as one JSON line to a writer (stdout by default).
pub struct JsonLinesEventSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesEventSink<std::io::Stdout> {
    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesEventSink<W> {
    /// Creates a sink over any writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> std::fmt::Debug for JsonLinesEventSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesEventSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> EventSink for JsonLinesEventSink<W> {
    fn emit(&self, event: &PipelineEvent) {
        let line = match EventRecord::new(event.clone()).to_json_line() {
            Ok(line) => line,
            Err(err) => {
                warn!(kind = event.kind(), error = %err, "Failed to serialize event");
                return;
            }
        };
        let mut writer = self.writer.lock();
        if let Err(err) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!(kind = event.kind(), error = %err, "Failed to write event");
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events of the given kind, e.g. `StageLogEvent`.
    #[must_use]
    pub fn events_of_kind(&self, kind: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Returns events belonging to the given stage.
    #[must_use]
    pub fn events_for_stage(&self, stage: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.stage() == Some(stage))
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}
