//! Threshold evaluation against reported Cedar metrics.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use super::{BoundDirection, ThresholdRule, ThresholdTable};
use crate::cedar::{CedarMetric, CedarTestReport};
use crate::errors::{GateError, GateResult};

/// Identity of a reported metric within a suite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportedMetricKey {
    pub test_name: String,
    pub thread_level: u32,
    pub metric_name: String,
}

impl ReportedMetricKey {
    pub fn new(test_name: &str, thread_level: u32, metric_name: &str) -> Self {
        Self {
            test_name: test_name.to_string(),
            thread_level,
            metric_name: metric_name.to_string(),
        }
    }
}

impl fmt::Display for ReportedMetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} thread_level={} {}",
            self.test_name, self.thread_level, self.metric_name
        )
    }
}

/// Reported metrics of one benchmark, keyed by `(test, thread level, metric)`.
#[derive(Debug, Clone, Default)]
pub struct ReportedMetrics {
    metrics: HashMap<ReportedMetricKey, CedarMetric>,
}

impl ReportedMetrics {
    /// Index the metrics of a set of Cedar reports.
    ///
    /// Fails with `DuplicateMetric` if two metrics share a key.
    pub fn from_reports(reports: &[CedarTestReport]) -> GateResult<Self> {
        let mut out = Self::default();
        for report in reports {
            for metric in &report.metrics {
                let key =
                    ReportedMetricKey::new(&report.test_name, report.thread_level, &metric.name);
                if out.metrics.insert(key, metric.clone()).is_some() {
                    return Err(GateError::DuplicateMetric {
                        base_name: report.test_name.clone(),
                        names: vec![metric.name.clone()],
                    });
                }
            }
        }
        Ok(out)
    }

    pub fn get(&self, key: &ReportedMetricKey) -> Option<&CedarMetric> {
        self.metrics.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ReportedMetricKey> {
        self.metrics.keys()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// A rule that did not hold.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdViolation {
    /// A threshold is configured but the metric was not reported.
    MissingMetric { key: ReportedMetricKey },
    /// The reported value is on the wrong side of the bound.
    Breached {
        key: ReportedMetricKey,
        reported: f64,
        threshold: f64,
        direction: BoundDirection,
    },
}

impl ThresholdViolation {
    pub fn key(&self) -> &ReportedMetricKey {
        match self {
            Self::MissingMetric { key } | Self::Breached { key, .. } => key,
        }
    }
}

impl fmt::Display for ThresholdViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMetric { key } => {
                write!(f, "{}: threshold is set but the metric was not reported", key)
            }
            Self::Breached {
                key,
                reported,
                threshold,
                direction,
            } => {
                let relation = match direction {
                    BoundDirection::Upper => "above the upper",
                    BoundDirection::Lower => "below the lower",
                };
                write!(
                    f,
                    "{}: reported value {} is {} bound {}",
                    key, reported, relation, threshold
                )
            }
        }
    }
}

/// Evaluate rules against reported metrics. Every rule is checked.
pub fn check_rules(rules: &[ThresholdRule], reported: &ReportedMetrics) -> Vec<ThresholdViolation> {
    let mut violations = Vec::new();
    for rule in rules {
        let key = rule.key();
        match reported.get(&key) {
            None => violations.push(ThresholdViolation::MissingMetric { key }),
            Some(metric) => {
                debug!(
                    metric = %key,
                    reported = metric.value,
                    threshold = rule.value,
                    bound = rule.bound_direction.as_str(),
                    "checking threshold"
                );
                if rule.bound_direction.is_violated(metric.value, rule.value) {
                    violations.push(ThresholdViolation::Breached {
                        key,
                        reported: metric.value,
                        threshold: rule.value,
                        direction: rule.bound_direction,
                    });
                }
            }
        }
    }
    for v in &violations {
        warn!(metric = %v.key(), violation = %v, "performance threshold violated");
    }
    violations
}

/// Applies the loaded threshold table and remembers whether anything was
/// evaluated during the suite.
#[derive(Debug, Clone, Default)]
pub struct ThresholdChecker {
    table: ThresholdTable,
    has_checked_results: bool,
}

impl ThresholdChecker {
    pub fn new(table: ThresholdTable) -> Self {
        Self {
            table,
            has_checked_results: false,
        }
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    pub fn has_checked_results(&self) -> bool {
        self.has_checked_results
    }

    /// Whether any rule applies to `test_name`.
    pub fn has_rules_for(&self, test_name: &str) -> bool {
        !self.table.rules_for(test_name).is_empty()
    }

    /// Check the rules of every listed base name.
    pub fn check<'a>(
        &mut self,
        base_names: impl IntoIterator<Item = &'a str>,
        reported: &ReportedMetrics,
    ) -> Vec<ThresholdViolation> {
        let mut violations = Vec::new();
        for name in base_names {
            let rules = self.table.rules_for(name);
            if rules.is_empty() {
                continue;
            }
            self.has_checked_results = true;
            violations.extend(check_rules(rules, reported));
        }
        violations
    }
}
