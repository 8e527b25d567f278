//! Legacy combined benchmark report (`perf.json`).
//!
//! Older consumers read a single document holding every base benchmark with
//! per-thread-count throughput values. Only `cpu_time` is projected, negated
//! so that larger is better.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::benchmark::{BenchmarkContext, ThreadGroupReport};
use crate::errors::GateResult;
use crate::report::write_json;

const PERF_SOURCE_FIELD: &str = "cpu_time";
const PERF_AGGREGATE: &str = "mean";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfReport {
    /// Unix seconds.
    pub start: i64,
    pub end: i64,
    pub results: Vec<PerfTestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfTestResult {
    pub name: String,
    pub context: BenchmarkContext,
    /// Keyed by thread count.
    pub results: BTreeMap<String, ThreadResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadResult {
    pub ops_per_sec: f64,
    pub ops_per_sec_values: Vec<f64>,
    pub error_values: Vec<i64>,
}

impl ThreadResult {
    /// Build from one bucket. Returns `None` when nothing was measured.
    fn from_group(group: &ThreadGroupReport, thread_count: &str) -> Option<Self> {
        let values: Vec<f64> = group
            .iterations(thread_count)
            .filter_map(|r| r.metric(PERF_SOURCE_FIELD))
            .map(|v| -v)
            .collect();
        let mean = group
            .aggregates(thread_count)
            .filter(|r| r.aggregate_name.as_deref() == Some(PERF_AGGREGATE))
            .find_map(|r| r.metric(PERF_SOURCE_FIELD))
            .map(|v| -v);

        let ops_per_sec = match mean {
            Some(m) => m,
            None if values.is_empty() => return None,
            None => values.iter().sum::<f64>() / values.len() as f64,
        };
        Some(Self {
            ops_per_sec,
            error_values: vec![0; values.len()],
            ops_per_sec_values: values,
        })
    }
}

impl PerfTestResult {
    pub fn from_group(group: &ThreadGroupReport) -> Self {
        let results = group
            .thread_counts()
            .filter_map(|tc| ThreadResult::from_group(group, tc).map(|r| (tc.to_string(), r)))
            .collect();
        Self {
            name: group.name.clone(),
            context: group.context.clone(),
            results,
        }
    }
}

/// Thread groups collected across a suite. Groups with the same base name
/// are merged.
#[derive(Debug, Clone, Default)]
pub struct PerfReportBuilder {
    groups: Vec<ThreadGroupReport>,
}

impl PerfReportBuilder {
    pub fn add_group(&mut self, group: ThreadGroupReport) {
        match self.groups.iter_mut().find(|g| g.name == group.name) {
            Some(existing) => existing.extend(group),
            None => self.groups.push(group),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn build(&self, start: i64, end: i64) -> PerfReport {
        PerfReport {
            start,
            end,
            results: self.groups.iter().map(PerfTestResult::from_group).collect(),
        }
    }
}

pub fn write_perf_report(report: &PerfReport, out: &Path) -> GateResult<()> {
    write_json(report, out)?;
    debug!(path = %out.display(), tests = report.results.len(), "wrote perf report");
    Ok(())
}
