//! Stage handlers and named handler groups.
//!
//! Handlers are the units of work the engine runs. Any async closure taking
//! a [`StageContext`] is a handler; types with their own state can implement
//! [`StageHandler`] directly.

mod group;

pub use group::StageGroup;

use crate::context::StageContext;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// A unit of pipeline work.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Runs the stage. Returning an error fails the stage.
    async fn run(&self, ctx: &StageContext) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> StageHandler for F
where
    F: Fn(StageContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, ctx: &StageContext) -> anyhow::Result<()> {
        (self)(ctx.clone()).await
    }
}

/// Shares a handler so it can be handed to the engine.
pub fn handler<H>(handler: H) -> Arc<dyn StageHandler>
where
    H: StageHandler + 'static,
{
    Arc::new(handler)
}
