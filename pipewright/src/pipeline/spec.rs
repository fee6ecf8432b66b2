//! Stage specifications.

use crate::core::{Deployment, DeploymentType};
use crate::events::PipelineEvent;
use crate::stages::StageHandler;
use std::sync::Arc;

/// One stage invocation: its identity plus the handler to run.
///
/// Specs are built per call and dropped once the stage has run.
#[derive(Clone)]
pub struct StageSpec {
    /// The stage name.
    pub name: String,
    /// The parallel group the stage runs in.
    pub parallel: Option<String>,
    /// Deployment metadata for deployment stages.
    pub deployment: Option<Deployment>,
    /// The handler.
    pub handler: Arc<dyn StageHandler>,
}

impl StageSpec {
    /// Creates a plain stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: Arc<dyn StageHandler>) -> Self {
        Self {
            name: name.into(),
            parallel: None,
            deployment: None,
            handler,
        }
    }

    /// Places the stage in a parallel group.
    #[must_use]
    pub fn with_parallel(mut self, group: impl Into<String>) -> Self {
        self.parallel = Some(group.into());
        self
    }

    /// Attaches deployment metadata.
    #[must_use]
    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    /// The `Deploy to {target}` stage.
    #[must_use]
    pub fn deploy(target: &str, handler: Arc<dyn StageHandler>) -> Self {
        Self::new(deploy_name(target), handler)
            .with_deployment(Deployment::new(target, DeploymentType::Load))
    }

    /// The `Rollback {target}` stage.
    #[must_use]
    pub fn rollback(target: &str, handler: Arc<dyn StageHandler>) -> Self {
        Self::new(rollback_name(target), handler)
            .with_deployment(Deployment::new(target, DeploymentType::Rollback))
    }

    /// A keyed member of a parallel deployment or rollback.
    #[must_use]
    pub fn keyed(
        target: &str,
        indicator: &str,
        key: &str,
        deployment_type: DeploymentType,
        handler: Arc<dyn StageHandler>,
    ) -> Self {
        let group = match deployment_type {
            DeploymentType::Rollback => rollback_name(target),
            DeploymentType::Load | DeploymentType::Fallback => deploy_name(target),
        };
        Self::new(format!("{group} ({key})"), handler)
            .with_parallel(group)
            .with_deployment(Deployment::tagged(target, indicator, key, deployment_type))
    }

    /// Builds the start event for this stage.
    #[must_use]
    pub fn start_event(&self) -> PipelineEvent {
        PipelineEvent::start(&self.name, self.parallel.clone(), self.deployment.clone())
    }
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("parallel", &self.parallel)
            .field("deployment", &self.deployment)
            .finish_non_exhaustive()
    }
}

pub(crate) fn deploy_name(target: &str) -> String {
    format!("Deploy to {target}")
}

pub(crate) fn rollback_name(target: &str) -> String {
    format!("Rollback {target}")
}
