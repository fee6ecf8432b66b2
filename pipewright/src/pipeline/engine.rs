//! The pipeline orchestrator.

use super::builder::{FailureCallback, PipelineBuilder};
use super::runner::{run_stage, StageOutcome};
use super::spec::{deploy_name, StageSpec};
use crate::config::PipelineConfig;
use crate::context::{LogSink, PipelineContext, StageContext};
use crate::core::{DeploymentType, Link};
use crate::errors::PipelineError;
use crate::events::EventPublisher;
use crate::stages::{StageGroup, StageHandler};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error};

/// Runs stages, parallel groups and deployments, in call order.
///
/// Every method returns `true` on success. On failure the stage's end
/// event carries the reason, the failure callback fires exactly once for
/// the call, and `false` is returned.
pub struct Pipeline {
    publisher: EventPublisher,
    context: PipelineContext,
    config: Arc<PipelineConfig>,
    on_failure: FailureCallback,
}

impl Pipeline {
    pub(crate) fn new(
        publisher: EventPublisher,
        context: PipelineContext,
        config: PipelineConfig,
        on_failure: FailureCallback,
    ) -> Self {
        Self {
            publisher,
            context,
            config: Arc::new(config),
            on_failure,
        }
    }

    /// Starts building a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the current pipeline version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.context.version()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Changes the job's display name.
    pub fn rename(&self, display_name: impl Into<String>) {
        self.publisher.rename(display_name);
    }

    /// Attaches links to the job.
    pub fn add_links(&self, links: Vec<Link>) {
        self.publisher.links(links);
    }

    /// Attaches one link to the job.
    pub fn add_link(&self, link: Link) {
        self.add_links(vec![link]);
    }

    /// Attaches one link to the job.
    pub fn link(&self, name: impl Into<String>, url: impl Into<String>, logo: impl Into<String>) {
        self.add_link(Link::new(name, url, logo));
    }

    /// Masks `secret` in every later log message and failure reason.
    pub fn conceal(&self, secret: impl Into<String>) {
        self.publisher.conceal(secret);
    }

    /// Runs a single stage.
    pub async fn stage<H>(&mut self, name: impl Into<String>, handler: H) -> bool
    where
        H: StageHandler + 'static,
    {
        let ok = self.run_single(StageSpec::new(name, Arc::new(handler))).await;
        self.finish(ok)
    }

    /// Runs every handler of `stages` concurrently as members of `group`,
    /// each as its own stage named by its key. All members run to
    /// completion; the group succeeds only if all of them do.
    pub async fn parallel(&mut self, group: impl Into<String>, stages: StageGroup) -> bool {
        let group = group.into();
        let specs = stages
            .iter()
            .map(|(key, handler)| StageSpec::new(key, handler.clone()).with_parallel(&group))
            .collect();
        let ok = self.run_group(specs).await;
        self.finish(ok)
    }

    /// Runs `handler` as the `Deploy to {target}` stage.
    pub async fn deploy<H>(&mut self, target: &str, handler: H) -> bool
    where
        H: StageHandler + 'static,
    {
        let ok = self.run_single(StageSpec::deploy(target, Arc::new(handler))).await;
        self.finish(ok)
    }

    /// Runs `handler` as the `Deploy to {target}` stage, followed by
    /// `rollback` as `Rollback {target}` if the deployment fails.
    pub async fn deploy_with_rollback<H, R>(&mut self, target: &str, handler: H, rollback: R) -> bool
    where
        H: StageHandler + 'static,
        R: StageHandler + 'static,
    {
        if self.run_single(StageSpec::deploy(target, Arc::new(handler))).await {
            return true;
        }
        debug!(deploy_target = target, "Deployment failed, rolling back");
        self.run_single(StageSpec::rollback(target, Arc::new(rollback))).await;
        self.finish(false)
    }

    /// Deploys to several instances of `target` concurrently, one member
    /// per key of `deployments`, each tagged `{indicator: key}`.
    pub async fn deploy_parallel(
        &mut self,
        target: &str,
        indicator: &str,
        deployments: StageGroup,
    ) -> bool {
        let ok = self
            .run_keyed(target, indicator, &deployments, DeploymentType::Load)
            .await;
        self.finish(ok)
    }

    /// Like [`Pipeline::deploy_parallel`], running every rollback
    /// concurrently if any deployment fails.
    ///
    /// Both groups must have the same keys. Otherwise a single failing
    /// `Deploy to {target}` stage reports the mismatch and no deployment
    /// runs.
    pub async fn deploy_parallel_with_rollback(
        &mut self,
        target: &str,
        indicator: &str,
        deployments: StageGroup,
        rollbacks: StageGroup,
    ) -> bool {
        if !deployments.same_keys(&rollbacks) {
            let mismatch =
                PipelineError::rollback_key_mismatch(deployments.keys(), rollbacks.keys());
            error!(deploy_target = target, error = %mismatch, "Rejecting parallel deployment");
            let reject = move |_ctx: StageContext| {
                let mismatch = mismatch.clone();
                async move { Err::<(), _>(anyhow::Error::new(mismatch)) }
            };
            self.run_single(StageSpec::new(deploy_name(target), Arc::new(reject)))
                .await;
            return self.finish(false);
        }

        if self
            .run_keyed(target, indicator, &deployments, DeploymentType::Load)
            .await
        {
            return true;
        }
        debug!(deploy_target = target, "Parallel deployment failed, rolling back all members");
        self.run_keyed(target, indicator, &rollbacks, DeploymentType::Rollback)
            .await;
        self.finish(false)
    }

    fn finish(&self, ok: bool) -> bool {
        if !ok {
            (self.on_failure)();
        }
        ok
    }

    async fn run_keyed(
        &mut self,
        target: &str,
        indicator: &str,
        group: &StageGroup,
        deployment_type: DeploymentType,
    ) -> bool {
        let specs = group
            .iter()
            .map(|(key, handler)| {
                StageSpec::keyed(target, indicator, key, deployment_type, handler.clone())
            })
            .collect();
        self.run_group(specs).await
    }

    async fn run_single(&mut self, spec: StageSpec) -> bool {
        let mut log = LogSink::new(self.publisher.clone(), &spec.name);
        if let Some(group) = &spec.parallel {
            log = log.with_parallel(group);
        }
        self.publisher.publish(spec.start_event());
        let outcome = run_stage(
            spec.handler,
            log,
            self.context.version().map(ToString::to_string),
            self.config.clone(),
        )
        .await;
        self.apply(outcome)
    }

    async fn run_group(&mut self, specs: Vec<StageSpec>) -> bool {
        if specs.is_empty() {
            return true;
        }
        let version = self.context.version().map(ToString::to_string);
        self.publisher
            .publish_all(specs.iter().map(StageSpec::start_event));

        let members = specs.into_iter().map(|spec| {
            let mut log = LogSink::new(self.publisher.clone(), &spec.name);
            if let Some(group) = &spec.parallel {
                log = log.with_parallel(group);
            }
            run_stage(spec.handler, log.buffered(), version.clone(), self.config.clone())
        });
        let outcomes = join_all(members).await;

        outcomes
            .into_iter()
            .fold(true, |ok, outcome| self.apply(outcome) && ok)
    }

    fn apply(&mut self, outcome: StageOutcome) -> bool {
        if let Some(version) = outcome.version {
            self.context.set_version(version);
        }
        outcome.success
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
