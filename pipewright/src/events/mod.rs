//! Lifecycle event model and delivery.
//!
//! Events are published through an [`EventPublisher`] to a single
//! [`EventSink`]. The default sink writes one JSON record per line to
//! standard output for consumption by an external observer.

mod event;
mod publisher;
mod sink;

pub use event::{
    EndStageEvent, EventRecord, PipelineEvent, StageLogEvent, StartStageEvent, UpdateJobEvent,
    API_VERSION,
};
pub use publisher::EventPublisher;
pub use sink::{
    CollectingEventSink, EventSink, JsonLinesEventSink, LoggingEventSink, NoOpEventSink,
};
