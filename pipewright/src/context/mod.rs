//! Context management for stage execution.
//!
//! This module provides:
//! - [`LogSink`], the explicit logging context of one stage
//! - [`StageContext`], the per-execution record handed to handlers
//! - [`PipelineContext`], the engine-owned version state

mod log;
mod pipeline;
mod stage;

pub use log::LogSink;
pub use pipeline::{PipelineContext, StaticVersion, VersionProvider};
pub use stage::StageContext;
