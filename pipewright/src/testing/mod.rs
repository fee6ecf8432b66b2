//! Testing utilities for pipewright pipelines.
//!
//! This module provides:
//! - A pipeline harness collecting events and counting failures
//! - Assertions over collected events
//! - Mock handlers and a scripted transport for the remote exec backend

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_end_event, assert_log_event, assert_start_event, stage_sequence};
pub use fixtures::TestPipeline;
pub use mocks::{FailingHandler, RecordingHandler, ScriptedChannel, ScriptedTransport, SlowHandler};
