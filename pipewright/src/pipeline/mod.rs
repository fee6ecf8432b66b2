//! Pipeline building and execution.
//!
//! This module provides:
//! - The [`Pipeline`] orchestrator for stages, parallel groups and
//!   deployments with rollback
//! - [`PipelineBuilder`] for wiring sinks, configuration and callbacks
//! - [`StageSpec`], the description of a single stage invocation

mod builder;
mod engine;
#[cfg(test)]
mod integration_tests;
mod runner;
mod spec;

pub use builder::{FailureCallback, PipelineBuilder};
pub use engine::Pipeline;
pub use spec::StageSpec;
