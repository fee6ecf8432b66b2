//! # Pipewright
//!
//! An embeddable pipeline-as-code orchestration engine for CI/CD.
//!
//! Pipewright runs units of work ("stages") in the order a program asks
//! for them and reports their lifecycle as a JSON-lines event stream:
//!
//! - **Stages and parallel groups**: sequential stages, or groups that run
//!   concurrently and join before the pipeline continues
//! - **Deployments**: deployment stages with optional rollback, including
//!   parallel deployments across several instances of a target
//! - **Pipeline version**: a version value handed from stage to stage
//! - **Command execution**: one contract for local processes and commands
//!   run inside a container, with identical timeout and failure semantics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipewright::prelude::*;
//!
//! # async fn run() -> Result<(), PipelineError> {
//! let mut pipeline = Pipeline::builder().version("1.0.0").build()?;
//!
//! pipeline
//!     .stage("Build", |ctx: StageContext| async move {
//!         ctx.exec(["cargo", "build", "--release"]).await?;
//!         anyhow::Ok(())
//!     })
//!     .await;
//!
//! pipeline
//!     .deploy_with_rollback(
//!         "staging",
//!         |ctx: StageContext| async move {
//!             ctx.exec(["./deploy.sh", "staging"]).await?;
//!             anyhow::Ok(())
//!         },
//!         |ctx: StageContext| async move {
//!             ctx.exec(["./rollback.sh", "staging"]).await?;
//!             anyhow::Ok(())
//!         },
//!     )
//!     .await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod exec;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LocalExecConfig, LoggingConfig, PipelineConfig, RemoteExecConfig};
    pub use crate::context::{LogSink, PipelineContext, StageContext, StaticVersion, VersionProvider};
    pub use crate::core::{
        Deployment, DeploymentType, Link, LogLevel, TestReport, TestResult, TestStatus,
        TestSuiteResult,
    };
    pub use crate::errors::{HandlerFailure, PipelineError};
    pub use crate::events::{
        CollectingEventSink, EventRecord, EventSink, JsonLinesEventSink, LoggingEventSink,
        NoOpEventSink, PipelineEvent,
    };
    pub use crate::exec::{
        argv, CommandResult, ContainerTarget, Exec, ExecChannel, ExecError, ExecTransport,
        LocalExec, RemoteExec,
    };
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{Pipeline, PipelineBuilder, StageSpec};
    pub use crate::stages::{handler, StageGroup, StageHandler};
    pub use crate::utils::{epoch_millis, Timestamp};
}
