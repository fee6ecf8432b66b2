//! Test fixtures for pipeline testing.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::events::{CollectingEventSink, PipelineEvent};
use crate::pipeline::{Pipeline, PipelineBuilder};

/// A pipeline wired to a collecting sink and a counting failure callback.
///
/// Dereferences to the underlying [`Pipeline`].
#[derive(Debug)]
pub struct TestPipeline {
    pipeline: Pipeline,
    events: Arc<CollectingEventSink>,
    failures: Arc<AtomicUsize>,
}

impl TestPipeline {
    /// Creates a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_builder(PipelineBuilder::new())
    }

    /// Creates a harness with an initial version.
    #[must_use]
    pub fn with_version(version: impl Into<String>) -> Self {
        Self::with_builder(PipelineBuilder::new().version(version))
    }

    /// Creates a harness with the given configuration.
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self::with_builder(PipelineBuilder::new().config(config))
    }

    /// Creates a harness from a builder; its sink and failure callback
    /// are replaced.
    ///
    /// # Panics
    ///
    /// Panics if the builder's version provider fails.
    #[must_use]
    pub fn with_builder(builder: PipelineBuilder) -> Self {
        let events = Arc::new(CollectingEventSink::new());
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        let pipeline = builder
            .sink(events.clone())
            .on_failure(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .expect("test pipeline should build");
        Self {
            pipeline,
            events,
            failures,
        }
    }

    /// Returns all events published so far.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.events()
    }

    /// Returns the collecting sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<CollectingEventSink> {
        &self.events
    }

    /// Returns how many times the failure callback fired.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestPipeline {
    type Target = Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipeline
    }
}

impl DerefMut for TestPipeline {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pipeline
    }
}
