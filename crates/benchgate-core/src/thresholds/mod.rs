//! Performance threshold policy.
//!
//! The policy file maps `test name → build variant → thread levels`:
//!
//! ```yaml
//! tests:
//!   Suite/BM_X:
//!     linux-64-release:
//!       - thread_level: 1
//!         metrics:
//!           - name: latency_per_op_0
//!             bound_direction: upper
//!             value: 20000
//! ```
//!
//! Only the active variant's rules are materialised. Unknown keys are
//! preserved on load and ignored when comparing.

pub mod check;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{GateError, GateResult};

pub use check::{ReportedMetricKey, ReportedMetrics, ThresholdChecker, ThresholdViolation};

/// Conventional location of the policy file, relative to the repo root.
pub const DEFAULT_THRESHOLDS_FILE: &str = "etc/performance_thresholds.yml";

/// Which side of the threshold a reported value must stay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundDirection {
    /// Reported value must be `<=` the threshold.
    Upper,
    /// Reported value must be `>=` the threshold.
    Lower,
}

impl BoundDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
        }
    }

    /// Whether `reported` crosses `threshold`. Equality never violates.
    pub fn is_violated(&self, reported: f64, threshold: f64) -> bool {
        match self {
            Self::Upper => reported > threshold,
            Self::Lower => reported < threshold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    #[serde(default)]
    pub tests: BTreeMap<String, BTreeMap<String, Vec<ThreadLevelThresholds>>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadLevelThresholds {
    pub thread_level: u32,
    #[serde(default)]
    pub metrics: Vec<MetricThreshold>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub name: String,
    pub bound_direction: BoundDirection,
    pub value: f64,
    /// e.g. `threshold_limit`; carried but not interpreted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A single bound on one reported metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub test_name: String,
    pub thread_level: u32,
    pub metric_name: String,
    pub value: f64,
    pub bound_direction: BoundDirection,
}

impl ThresholdRule {
    pub fn key(&self) -> ReportedMetricKey {
        ReportedMetricKey::new(&self.test_name, self.thread_level, &self.metric_name)
    }
}

impl PerformanceThresholds {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Load the policy file. Any failure is fatal for the suite.
    pub fn from_file(path: &Path) -> GateResult<Self> {
        let load_err = |message: String| GateError::PolicyLoad {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        Self::from_yaml(&content).map_err(|e| load_err(e.to_string()))
    }

    /// Rules for one build variant, keyed by test name.
    pub fn rules_for_variant(&self, variant: &str) -> BTreeMap<String, Vec<ThresholdRule>> {
        let mut out: BTreeMap<String, Vec<ThresholdRule>> = BTreeMap::new();
        for (test_name, variants) in &self.tests {
            let Some(levels) = variants.get(variant) else {
                continue;
            };
            let rules = out.entry(test_name.clone()).or_default();
            for level in levels {
                for metric in &level.metrics {
                    rules.push(ThresholdRule {
                        test_name: test_name.clone(),
                        thread_level: level.thread_level,
                        metric_name: metric.name.clone(),
                        value: metric.value,
                        bound_direction: metric.bound_direction,
                    });
                }
            }
        }
        out
    }

    /// Every variant name mentioned in the file.
    pub fn variants(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tests
            .values()
            .flat_map(|v| v.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Rules of the active variant, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    policy_file: PathBuf,
    variant: Option<String>,
    rules: BTreeMap<String, Vec<ThresholdRule>>,
}

impl ThresholdTable {
    /// Load the policy file and keep the rules for `variant`.
    ///
    /// A missing variant is not an error: some builds have no thresholds.
    pub fn load(path: &Path, variant: Option<&str>) -> GateResult<Self> {
        let policy = PerformanceThresholds::from_file(path)?;
        Ok(Self::from_policy(path, &policy, variant))
    }

    pub fn from_policy(path: &Path, policy: &PerformanceThresholds, variant: Option<&str>) -> Self {
        let rules = match variant {
            Some(v) => policy.rules_for_variant(v),
            None => BTreeMap::new(),
        };
        match variant {
            Some(v) if rules.is_empty() => {
                info!(variant = v, policy = %path.display(), "no performance thresholds for variant");
            }
            None => {
                info!(policy = %path.display(), "no build variant set; skipping performance thresholds");
            }
            Some(v) => {
                debug!(variant = v, tests = rules.len(), "loaded performance thresholds");
            }
        }
        Self {
            policy_file: path.to_path_buf(),
            variant: variant.map(str::to_string),
            rules,
        }
    }

    pub fn policy_file(&self) -> &Path {
        &self.policy_file
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn rules_for(&self, test_name: &str) -> &[ThresholdRule] {
        self.rules.get(test_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rules.values().all(Vec::is_empty)
    }

    pub fn tests(&self) -> impl Iterator<Item = (&str, &[ThresholdRule])> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
