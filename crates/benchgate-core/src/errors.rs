//! Error types for the benchmark gate.

use std::path::PathBuf;

use crate::thresholds::ThresholdViolation;

/// Errors raised by the hook lifecycle and the pipeline stages it drives.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Threshold policy file missing or unparsable.
    #[error("cannot load thresholds from {path}: {message}")]
    PolicyLoad { path: PathBuf, message: String },

    /// Benchmark JSON report malformed or missing required sections.
    #[error("failed to parse benchmark report {source_name}: {message}")]
    ReportParse {
        source_name: String,
        message: String,
    },

    /// Two metrics share a `(test, thread level, metric)` key.
    #[error("duplicated metric names in {base_name}: {}", .names.join(", "))]
    DuplicateMetric {
        base_name: String,
        names: Vec<String>,
    },

    /// Reported metrics crossed configured bounds and no override applied.
    #[error("{}", render_violations(.policy_file, .violations))]
    ThresholdViolation {
        policy_file: PathBuf,
        violations: Vec<ThresholdViolation>,
    },

    /// Merge-queue run without the context needed to look up an override.
    #[error("merge queue run is missing {field}: {detail}")]
    MissingOverrideContext { field: String, detail: String },

    /// Code-review API lookup failed.
    #[error("override lookup failed for PR #{pr_number}: {message}")]
    OverrideLookup { pr_number: u64, message: String },

    /// Whether thresholds were evaluated disagrees with `check_result`.
    #[error(
        "check_result is {check_result} but thresholds were {}evaluated in this suite",
        evaluated_prefix(.has_checked_results)
    )]
    Consistency {
        check_result: bool,
        has_checked_results: bool,
    },

    /// Lifecycle method called out of order.
    #[error("{operation} is not allowed while the suite is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Gate configuration or expansions file unreadable.
    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Output report could not be written.
    #[error("failed to write {path}: {message}")]
    ReportWrite { path: PathBuf, message: String },
}

impl GateError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Benchmark-level failures
            Self::ReportParse { .. } => 1,
            Self::DuplicateMetric { .. } => 1,
            Self::ThresholdViolation { .. } => 1,
            Self::MissingOverrideContext { .. } => 1,
            Self::OverrideLookup { .. } => 1,

            // Suite setup / internal
            Self::PolicyLoad { .. } => 2,
            Self::InvalidState { .. } => 2,
            Self::Config { .. } => 2,
            Self::ReportWrite { .. } => 2,

            Self::Consistency { .. } => 3,
        }
    }

    /// Whether the error fails the whole suite rather than a single test.
    pub fn is_suite_fatal(&self) -> bool {
        matches!(
            self,
            Self::PolicyLoad { .. }
                | Self::Consistency { .. }
                | Self::InvalidState { .. }
                | Self::Config { .. }
                | Self::ReportWrite { .. }
        )
    }
}

fn evaluated_prefix(has_checked_results: &bool) -> &'static str {
    if *has_checked_results {
        ""
    } else {
        "never "
    }
}

fn render_violations(policy_file: &std::path::Path, violations: &[ThresholdViolation]) -> String {
    let mut out = format!(
        "{} performance threshold violation(s); thresholds are defined in {}",
        violations.len(),
        policy_file.display()
    );
    for v in violations {
        out.push_str("\n  - ");
        out.push_str(&v.to_string());
    }
    out
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;
