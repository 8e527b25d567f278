pub mod console;
pub mod junit;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{GateError, GateResult};

/// Suffix of the dynamic sub-test registered for each threshold check.
pub const THRESHOLD_SUBTEST_SUFFIX: &str = "check_perf_thresholds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    /// Violations were found but an override approved them.
    Warn,
    Fail,
    /// The test's report could not be processed.
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }
}

/// One parent test or dynamic sub-test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRow {
    pub test_id: String,
    pub status: TestStatus,
    #[serde(default)]
    pub message: String,
    /// Parent test of a dynamic sub-test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl TestResultRow {
    pub fn new(test_id: impl Into<String>, status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            status,
            message: message.into(),
            parent: None,
        }
    }

    /// The threshold sub-test of `parent`.
    pub fn subtest(parent: &str, status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            test_id: subtest_name(parent),
            status,
            message: message.into(),
            parent: Some(parent.to_string()),
        }
    }
}

pub fn subtest_name(test_name: &str) -> String {
    format!("{}:{}", test_name, THRESHOLD_SUBTEST_SUFFIX)
}

/// Count of rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn from_rows(rows: &[TestResultRow]) -> Self {
        let mut counts = Self::default();
        for r in rows {
            match r.status {
                TestStatus::Pass => counts.pass += 1,
                TestStatus::Warn => counts.warn += 1,
                TestStatus::Fail => counts.fail += 1,
                TestStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.fail + self.error > 0
    }
}

/// Pretty-print `value` as JSON to `out`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(value: &T, out: &Path) -> GateResult<()> {
    let write_err = |message: String| GateError::ReportWrite {
        path: out.to_path_buf(),
        message,
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    let body = serde_json::to_string_pretty(value).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(out, body).map_err(|e| write_err(e.to_string()))
}
