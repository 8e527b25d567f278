//! Cedar performance report emission.
//!
//! Each thread-count bucket of a [`ThreadGroupReport`] becomes one
//! [`CedarTestReport`]. Only the metrics listed in [`RECOGNIZED_METRICS`]
//! are projected; iteration records are named by repetition index and
//! aggregate records by aggregate kind.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::benchmark::{BenchmarkRecord, ThreadGroupReport};
use crate::errors::{GateError, GateResult};
use crate::report::write_json;

/// Metric type tag understood by Cedar consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CedarMetricType {
    Latency,
    Mean,
    Median,
    StandardDeviation,
    Throughput,
}

impl CedarMetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latency => "LATENCY",
            Self::Mean => "MEAN",
            Self::Median => "MEDIAN",
            Self::StandardDeviation => "STANDARD_DEVIATION",
            Self::Throughput => "THROUGHPUT",
        }
    }
}

/// A benchmark field projected into Cedar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub source_field: &'static str,
    pub prefix: &'static str,
    pub default_type: CedarMetricType,
}

/// The only fields projected into Cedar reports.
pub const RECOGNIZED_METRICS: &[MetricSpec] = &[
    MetricSpec {
        source_field: "cpu_time",
        prefix: "latency_per_op",
        default_type: CedarMetricType::Latency,
    },
    MetricSpec {
        source_field: "instructions_per_iteration",
        prefix: "instructions_per_iteration",
        default_type: CedarMetricType::Latency,
    },
    MetricSpec {
        source_field: "cycles_per_iteration",
        prefix: "cycles_per_iteration",
        default_type: CedarMetricType::Latency,
    },
];

const AGGREGATE_TYPES: &[(&str, CedarMetricType)] = &[
    ("mean", CedarMetricType::Mean),
    ("median", CedarMetricType::Median),
    ("stddev", CedarMetricType::StandardDeviation),
];

/// Cedar type for an aggregate kind, if it has one.
pub fn aggregate_metric_type(aggregate_name: &str) -> Option<CedarMetricType> {
    AGGREGATE_TYPES
        .iter()
        .find(|(name, _)| *name == aggregate_name)
        .map(|(_, t)| *t)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CedarMetric {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: CedarMetricType,
    pub value: f64,
    #[serde(default)]
    pub user_submitted: bool,
}

impl CedarMetric {
    pub fn new(name: impl Into<String>, metric_type: CedarMetricType, value: f64) -> Self {
        Self {
            name: name.into(),
            metric_type,
            value,
            user_submitted: false,
        }
    }
}

/// Metrics of one base benchmark at one thread level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CedarReportWire", into = "CedarReportWire")]
pub struct CedarTestReport {
    pub test_name: String,
    pub thread_level: u32,
    pub metrics: Vec<CedarMetric>,
}

impl CedarTestReport {
    /// Metric names that occur more than once, in first-seen order.
    pub fn duplicate_metric_names(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for m in &self.metrics {
            *counts.entry(m.name.as_str()).or_insert(0) += 1;
        }
        let mut dups = Vec::new();
        for m in &self.metrics {
            if counts.get(m.name.as_str()).copied().unwrap_or(0) > 1 && !dups.contains(&m.name) {
                dups.push(m.name.clone());
            }
        }
        dups
    }
}

#[derive(Serialize, Deserialize)]
struct CedarReportWire {
    info: CedarInfo,
    metrics: Vec<CedarMetric>,
}

#[derive(Serialize, Deserialize)]
struct CedarInfo {
    test_name: String,
    args: CedarArgs,
}

#[derive(Serialize, Deserialize)]
struct CedarArgs {
    thread_level: u32,
}

impl From<CedarReportWire> for CedarTestReport {
    fn from(w: CedarReportWire) -> Self {
        Self {
            test_name: w.info.test_name,
            thread_level: w.info.args.thread_level,
            metrics: w.metrics,
        }
    }
}

impl From<CedarTestReport> for CedarReportWire {
    fn from(r: CedarTestReport) -> Self {
        Self {
            info: CedarInfo {
                test_name: r.test_name,
                args: CedarArgs {
                    thread_level: r.thread_level,
                },
            },
            metrics: r.metrics,
        }
    }
}

/// Parse a thread tag into a Cedar thread level.
pub fn thread_level(base_name: &str, thread_count: &str) -> GateResult<u32> {
    thread_count.parse().map_err(|_| GateError::ReportParse {
        source_name: base_name.to_string(),
        message: format!("thread level '{}' is not an integer", thread_count),
    })
}

/// Project a record into the metrics it contributes.
pub fn record_metrics(record: &BenchmarkRecord) -> Vec<CedarMetric> {
    let mut out = Vec::new();
    for spec in RECOGNIZED_METRICS {
        let Some(value) = record.metric(spec.source_field) else {
            continue;
        };
        match &record.aggregate_name {
            Some(agg) => match aggregate_metric_type(agg) {
                Some(t) => out.push(CedarMetric::new(
                    format!("{}_{}", spec.prefix, agg),
                    t,
                    value,
                )),
                None => {
                    debug!(record = %record.name, aggregate = %agg, "skipping unmapped aggregate");
                }
            },
            None => out.push(CedarMetric::new(
                format!("{}_{}", spec.prefix, record.repetition_index),
                spec.default_type,
                value,
            )),
        }
    }
    out
}

/// Emit one Cedar report per thread-count bucket of a group.
///
/// Metric names are not checked here; see [`check_duplicate_metric_names`].
pub fn emit_cedar_reports(group: &ThreadGroupReport) -> GateResult<Vec<CedarTestReport>> {
    let mut reports = Vec::new();
    for (thread_count, records) in group.buckets() {
        let level = thread_level(&group.name, thread_count)?;
        let metrics = records.iter().flat_map(record_metrics).collect();
        reports.push(CedarTestReport {
            test_name: group.name.clone(),
            thread_level: level,
            metrics,
        });
    }
    Ok(reports)
}

/// Fail if any report of `base_name` repeats a metric name.
pub fn check_duplicate_metric_names(
    base_name: &str,
    reports: &[CedarTestReport],
) -> GateResult<()> {
    let names: Vec<String> = reports
        .iter()
        .flat_map(CedarTestReport::duplicate_metric_names)
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(GateError::DuplicateMetric {
            base_name: base_name.to_string(),
            names,
        })
    }
}

/// Write the accumulated reports as a Cedar JSON array.
pub fn write_cedar_report(reports: &[CedarTestReport], out: &Path) -> GateResult<()> {
    write_json(reports, out)?;
    debug!(path = %out.display(), reports = reports.len(), "wrote cedar report");
    Ok(())
}
