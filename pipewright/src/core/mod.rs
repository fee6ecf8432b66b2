//! Core value types shared by events, contexts and the engine.

mod deployment;
mod link;
mod report;
mod status;

pub use deployment::Deployment;
pub use link::Link;
pub use report::{TestReport, TestResult, TestSuiteResult};
pub use status::{DeploymentType, LogLevel, TestStatus};
