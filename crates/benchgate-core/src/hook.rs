//! Suite lifecycle driver.
//!
//! The test runner calls [`BenchmarkHook::before_suite`] once, then
//! [`BenchmarkHook::after_test`] for every benchmark test and finally
//! [`BenchmarkHook::after_suite`]. All accumulated state lives on the hook.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::benchmark::{group_records, BenchmarkReport};
use crate::cedar::{
    check_duplicate_metric_names, emit_cedar_reports, write_cedar_report, CedarTestReport,
};
use crate::config::{Expansions, GateConfig};
use crate::errors::{GateError, GateResult};
use crate::override_gate::{CommentSource, OverrideApproval, OverrideDecision, OverrideGate};
use crate::perf_report::{write_perf_report, PerfReportBuilder};
use crate::report::{TestResultRow, TestStatus};
use crate::thresholds::{
    ReportedMetricKey, ReportedMetrics, ThresholdChecker, ThresholdTable, ThresholdViolation,
};

/// A finished benchmark test whose JSON report is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkTestCase {
    pub name: String,
    pub report_path: PathBuf,
}

impl BenchmarkTestCase {
    pub fn new(name: impl Into<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            report_path: report_path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Idle,
    SuiteOpen,
    SuiteClosed,
}

impl HookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SuiteOpen => "open",
            Self::SuiteClosed => "closed",
        }
    }
}

/// Result of the threshold sub-test of one benchmark.
#[derive(Debug)]
pub enum ThresholdCheck {
    Passed,
    Overridden {
        approval: OverrideApproval,
        violations: Vec<ThresholdViolation>,
    },
    /// `cause` is either the violation itself or the override failure.
    Failed {
        violations: Vec<ThresholdViolation>,
        cause: GateError,
    },
}

impl ThresholdCheck {
    pub fn status(&self) -> TestStatus {
        match self {
            Self::Passed => TestStatus::Pass,
            Self::Overridden { .. } => TestStatus::Warn,
            Self::Failed { .. } => TestStatus::Fail,
        }
    }

    fn message(&self, policy_file: &std::path::Path) -> String {
        let violation_text = |violations: &[ThresholdViolation]| {
            GateError::ThresholdViolation {
                policy_file: policy_file.to_path_buf(),
                violations: violations.to_vec(),
            }
            .to_string()
        };
        match self {
            Self::Passed => String::new(),
            Self::Overridden {
                approval,
                violations,
            } => format!(
                "override approved by {} ({} comment)\n{}",
                approval.author,
                approval.kind.as_str(),
                violation_text(violations)
            ),
            Self::Failed {
                cause: cause @ GateError::ThresholdViolation { .. },
                ..
            } => cause.to_string(),
            Self::Failed { violations, cause } => {
                format!("{}\n{}", cause, violation_text(violations))
            }
        }
    }
}

/// What `after_test` produced for one benchmark.
#[derive(Debug)]
pub struct TestOutcome {
    pub test_name: String,
    pub cedar_reports: usize,
    /// `None` when no thresholds apply to the benchmark.
    pub threshold_check: Option<ThresholdCheck>,
}

impl TestOutcome {
    pub fn status(&self) -> TestStatus {
        self.threshold_check
            .as_ref()
            .map(ThresholdCheck::status)
            .unwrap_or(TestStatus::Pass)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteOutcome {
    pub cedar_reports: usize,
    pub has_checked_results: bool,
    pub cedar_report_file: PathBuf,
    pub perf_report_file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct BenchmarkHook {
    config: GateConfig,
    expansions: Expansions,
    gate: OverrideGate,
    state: HookState,
    checker: ThresholdChecker,
    started_at: i64,
    cedar_reports: Vec<CedarTestReport>,
    reported_keys: HashSet<ReportedMetricKey>,
    perf: PerfReportBuilder,
    results: Vec<TestResultRow>,
}

impl BenchmarkHook {
    pub fn new(config: GateConfig, expansions: Expansions) -> Self {
        let gate = OverrideGate::new(&config.override_settings.approvers);
        Self {
            config,
            expansions,
            gate,
            state: HookState::Idle,
            checker: ThresholdChecker::default(),
            started_at: 0,
            cedar_reports: Vec::new(),
            reported_keys: HashSet::new(),
            perf: PerfReportBuilder::default(),
            results: Vec::new(),
        }
    }

    /// Client used to look up override comments in merge-queue runs.
    pub fn with_comment_source(mut self, source: Arc<dyn CommentSource>) -> Self {
        self.gate = self.gate.with_source(source);
        self
    }

    pub fn state(&self) -> HookState {
        self.state
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn cedar_reports(&self) -> &[CedarTestReport] {
        &self.cedar_reports
    }

    /// Parent and sub-test results recorded so far.
    pub fn results(&self) -> &[TestResultRow] {
        &self.results
    }

    pub fn has_checked_results(&self) -> bool {
        self.checker.has_checked_results()
    }

    fn require_open(&self, operation: &'static str) -> GateResult<()> {
        if self.state == HookState::SuiteOpen {
            Ok(())
        } else {
            Err(GateError::InvalidState {
                operation,
                state: self.state.as_str(),
            })
        }
    }

    /// Load thresholds for the active build variant and open the suite.
    pub fn before_suite(&mut self) -> GateResult<()> {
        if self.state != HookState::Idle {
            return Err(GateError::InvalidState {
                operation: "before_suite",
                state: self.state.as_str(),
            });
        }
        let table = ThresholdTable::load(
            &self.config.thresholds_file,
            self.expansions.build_variant.as_deref(),
        )?;
        info!(
            policy = %self.config.thresholds_file.display(),
            variant = table.variant().unwrap_or(""),
            merge_queue = self.expansions.is_merge_queue(),
            "benchmark suite started"
        );
        self.checker = ThresholdChecker::new(table);
        self.started_at = Utc::now().timestamp();
        self.state = HookState::SuiteOpen;
        Ok(())
    }

    /// Process one finished benchmark test.
    ///
    /// Report and duplicate-metric errors fail only this test: they are
    /// recorded as an errored result and returned, and the suite stays open.
    pub async fn after_test(&mut self, test: &BenchmarkTestCase) -> GateResult<TestOutcome> {
        self.require_open("after_test")?;
        match self.process(test).await {
            Ok(outcome) => {
                self.results
                    .push(TestResultRow::new(&test.name, TestStatus::Pass, ""));
                if let Some(check) = &outcome.threshold_check {
                    let message = check.message(self.checker.table().policy_file());
                    self.results
                        .push(TestResultRow::subtest(&test.name, check.status(), message));
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(test = %test.name, error = %e, "benchmark test failed");
                self.results
                    .push(TestResultRow::new(&test.name, TestStatus::Error, e.to_string()));
                Err(e)
            }
        }
    }

    async fn process(&mut self, test: &BenchmarkTestCase) -> GateResult<TestOutcome> {
        let report = BenchmarkReport::from_file(&test.report_path)?;
        let groups = group_records(&report);

        let mut cedar = Vec::new();
        for group in &groups {
            let reports = emit_cedar_reports(group)?;
            check_duplicate_metric_names(&group.name, &reports)?;
            cedar.extend(reports);
        }
        let reported = ReportedMetrics::from_reports(&cedar)?;
        self.check_suite_keys(&reported)?;

        debug!(
            test = %test.name,
            groups = groups.len(),
            cedar_reports = cedar.len(),
            metrics = reported.len(),
            "benchmark report processed"
        );
        let cedar_count = cedar.len();
        self.reported_keys.extend(reported.keys().cloned());
        self.cedar_reports.extend(cedar);

        let base_names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        for group in groups {
            self.perf.add_group(group);
        }

        let threshold_check = if base_names.iter().any(|n| self.checker.has_rules_for(n)) {
            let violations = self
                .checker
                .check(base_names.iter().map(String::as_str), &reported);
            Some(self.resolve(violations).await)
        } else {
            None
        };

        Ok(TestOutcome {
            test_name: test.name.clone(),
            cedar_reports: cedar_count,
            threshold_check,
        })
    }

    /// Reject metrics whose key was already reported earlier in the suite.
    fn check_suite_keys(&self, reported: &ReportedMetrics) -> GateResult<()> {
        let mut colliding: Vec<&ReportedMetricKey> = reported
            .keys()
            .filter(|k| self.reported_keys.contains(*k))
            .collect();
        if colliding.is_empty() {
            return Ok(());
        }
        colliding.sort();
        let base_name = colliding[0].test_name.clone();
        let names = colliding
            .iter()
            .filter(|k| k.test_name == base_name)
            .map(|k| format!("{} (thread_level={})", k.metric_name, k.thread_level))
            .collect();
        Err(GateError::DuplicateMetric { base_name, names })
    }

    async fn resolve(&mut self, violations: Vec<ThresholdViolation>) -> ThresholdCheck {
        if violations.is_empty() {
            return ThresholdCheck::Passed;
        }
        match self.gate.evaluate(&self.expansions).await {
            Ok(OverrideDecision::Approved(approval)) => ThresholdCheck::Overridden {
                approval,
                violations,
            },
            Ok(OverrideDecision::NotApplicable | OverrideDecision::Denied) => {
                let cause = GateError::ThresholdViolation {
                    policy_file: self.checker.table().policy_file().to_path_buf(),
                    violations: violations.clone(),
                };
                ThresholdCheck::Failed { violations, cause }
            }
            Err(cause) => ThresholdCheck::Failed { violations, cause },
        }
    }

    /// Write accumulated output and close the suite.
    ///
    /// Output is written before the `check_result` consistency check so that
    /// partial results survive a mis-wired suite.
    pub fn after_suite(&mut self) -> GateResult<SuiteOutcome> {
        self.require_open("after_suite")?;
        self.state = HookState::SuiteClosed;
        let ended_at = Utc::now().timestamp();

        write_cedar_report(&self.cedar_reports, &self.config.cedar_report_file)?;
        if let Some(path) = &self.config.perf_report_file {
            write_perf_report(&self.perf.build(self.started_at, ended_at), path)?;
        }

        let has_checked_results = self.checker.has_checked_results();
        info!(
            cedar_reports = self.cedar_reports.len(),
            has_checked_results,
            check_result = self.config.check_result,
            "benchmark suite finished"
        );
        if has_checked_results != self.config.check_result {
            return Err(GateError::Consistency {
                check_result: self.config.check_result,
                has_checked_results,
            });
        }

        Ok(SuiteOutcome {
            cedar_reports: self.cedar_reports.len(),
            has_checked_results,
            cedar_report_file: self.config.cedar_report_file.clone(),
            perf_report_file: self.config.perf_report_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    fn config(dir: &std::path::Path) -> GateConfig {
        let policy = write(dir, "thresholds.yml", "tests: {}\n");
        GateConfig::default()
            .with_thresholds_file(policy)
            .with_cedar_report_file(dir.join("cedar.json"))
    }

    #[tokio::test]
    async fn test_lifecycle_order_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut hook = BenchmarkHook::new(config(dir.path()), Expansions::default());
        let test = BenchmarkTestCase::new("t", dir.path().join("r.json"));

        let err = hook.after_test(&test).await.unwrap_err();
        assert!(matches!(
            err,
            GateError::InvalidState { operation: "after_test", state: "idle" }
        ));
        assert!(hook.after_suite().is_err());

        hook.before_suite().unwrap();
        assert!(hook.before_suite().is_err());
        hook.after_suite().unwrap();
        assert_eq!(hook.state(), HookState::SuiteClosed);
        assert!(hook.after_test(&test).await.is_err());
    }

    #[tokio::test]
    async fn test_parse_error_fails_only_that_test() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.json", "{\"context\": {}}");
        let mut hook = BenchmarkHook::new(config(dir.path()), Expansions::default());
        hook.before_suite().unwrap();

        let err = hook
            .after_test(&BenchmarkTestCase::new("bad", bad))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::ReportParse { .. }));
        assert_eq!(hook.results()[0].status, TestStatus::Error);
        assert_eq!(hook.state(), HookState::SuiteOpen);

        hook.after_suite().unwrap();
        assert!(dir.path().join("cedar.json").exists());
    }

    #[test]
    fn test_missing_policy_fails_suite_start() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GateConfig::default().with_thresholds_file(dir.path().join("absent.yml"));
        let mut hook = BenchmarkHook::new(cfg, Expansions::default());
        let err = hook.before_suite().unwrap_err();
        assert!(err.is_suite_fatal());
        assert_eq!(hook.state(), HookState::Idle);
    }
}
