//! Pipeline construction.

use super::Pipeline;
use crate::config::PipelineConfig;
use crate::context::{PipelineContext, VersionProvider};
use crate::errors::PipelineError;
use crate::events::{EventPublisher, EventSink, JsonLinesEventSink};
use std::sync::Arc;
use tracing::{debug, error};

/// Invoked once per failing top-level pipeline call.
pub type FailureCallback = Arc<dyn Fn() + Send + Sync>;

/// Builder for [`Pipeline`].
///
/// Defaults: events go to stdout as JSON lines, the failure callback exits
/// the process with status 1, and there is no initial version.
#[derive(Default)]
pub struct PipelineBuilder {
    sink: Option<Arc<dyn EventSink>>,
    config: PipelineConfig,
    on_failure: Option<FailureCallback>,
    version: Option<String>,
    version_provider: Option<Arc<dyn VersionProvider>>,
}

impl PipelineBuilder {
    /// Creates a builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the failure callback.
    #[must_use]
    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    /// Sets the initial version. Takes precedence over a provider.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Resolves the initial version from `provider` at build time.
    #[must_use]
    pub fn version_provider<P>(mut self, provider: P) -> Self
    where
        P: VersionProvider + 'static,
    {
        self.version_provider = Some(Arc::new(provider));
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let version = match (self.version, &self.version_provider) {
            (Some(version), _) => Some(version),
            (None, Some(provider)) => provider
                .version()
                .map_err(|err| PipelineError::VersionProvider(format!("{err:#}")))?,
            (None, None) => None,
        };
        debug!(version = ?version, "Building pipeline");

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(JsonLinesEventSink::stdout()));
        let on_failure = self.on_failure.unwrap_or_else(|| Arc::new(exit_on_failure));
        Ok(Pipeline::new(
            EventPublisher::new(sink),
            PipelineContext::new(version),
            self.config,
            on_failure,
        ))
    }
}

fn exit_on_failure() {
    error!("Pipeline failed");
    std::process::exit(1);
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("version", &self.version)
            .field("has_sink", &self.sink.is_some())
            .field("has_version_provider", &self.version_provider.is_some())
            .finish_non_exhaustive()
    }
}
