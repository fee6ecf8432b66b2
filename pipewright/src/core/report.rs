//! Test report model carried by end events.

use super::TestStatus;
use serde::{Deserialize, Serialize};

/// Structured results of a test run, attached to the stage that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    /// Free-text report type, e.g. "Unit tests".
    #[serde(rename = "type")]
    pub report_type: String,
    /// Suite results.
    #[serde(default)]
    pub suites: Vec<TestSuiteResult>,
}

impl TestReport {
    /// Creates an empty report of the given type.
    #[must_use]
    pub fn new(report_type: impl Into<String>) -> Self {
        Self {
            report_type: report_type.into(),
            suites: Vec::new(),
        }
    }

    /// Adds a suite.
    #[must_use]
    pub fn with_suite(mut self, suite: TestSuiteResult) -> Self {
        self.suites.push(suite);
        self
    }

    /// Counts tests with a failing status across all suites.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.suites
            .iter()
            .flat_map(|suite| suite.tests.iter())
            .filter(|test| test.status.is_failure())
            .count()
    }
}

/// Results of one test suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteResult {
    /// Suite identifier.
    pub id: String,
    /// Suite duration in milliseconds.
    pub duration_ms: u64,
    /// Individual test results.
    #[serde(default)]
    pub tests: Vec<TestResult>,
}

impl TestSuiteResult {
    /// Creates an empty suite.
    #[must_use]
    pub fn new(id: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            duration_ms,
            tests: Vec::new(),
        }
    }

    /// Adds a test result.
    #[must_use]
    pub fn with_test(mut self, test: TestResult) -> Self {
        self.tests.push(test);
        self
    }
}

/// Result of an individual test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Test identifier.
    pub id: String,
    /// Test duration in milliseconds.
    pub duration_ms: u64,
    /// Execution status.
    pub status: TestStatus,
    /// Failure or error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TestResult {
    /// Creates a test result without details.
    #[must_use]
    pub fn new(id: impl Into<String>, duration_ms: u64, status: TestStatus) -> Self {
        Self {
            id: id.into(),
            duration_ms,
            status,
            details: None,
        }
    }

    /// Sets the details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
