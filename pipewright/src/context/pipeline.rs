//! Pipeline-wide state and its initial version source.

/// Engine-owned state shared across stages.
///
/// Only the orchestrating control flow reads or writes it; parallel
/// members never touch it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    version: Option<String>,
}

impl PipelineContext {
    /// Creates a context with an optional initial version.
    #[must_use]
    pub fn new(version: Option<String>) -> Self {
        Self { version }
    }

    /// Returns the current version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Overwrites the current version.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }
}

/// Supplies the pipeline version before execution starts.
pub trait VersionProvider: Send + Sync {
    /// Resolves the version, if there is one.
    fn version(&self) -> anyhow::Result<Option<String>>;
}

impl<F> VersionProvider for F
where
    F: Fn() -> anyhow::Result<Option<String>> + Send + Sync,
{
    fn version(&self) -> anyhow::Result<Option<String>> {
        self()
    }
}

/// A provider returning a fixed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticVersion(Option<String>);

impl StaticVersion {
    /// Provides `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(Some(version.into()))
    }

    /// Provides no version.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }
}

impl VersionProvider for StaticVersion {
    fn version(&self) -> anyhow::Result<Option<String>> {
        Ok(self.0.clone())
    }
}
