//! Google Benchmark JSON reports.
//!
//! A report is a `context` block describing the host plus a flat
//! `benchmarks` array holding both iteration and aggregate records.

pub mod group;
pub mod name;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{GateError, GateResult};

pub use group::{group_records, ThreadGroupReport};
pub use name::{parse_name, ParsedName, DEFAULT_THREAD_COUNT};

/// Host description emitted by the benchmark binary.
///
/// Fields the gate does not know about are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkContext {
    pub date: String,
    pub num_cpus: i64,
    pub mhz_per_cpu: f64,
    pub library_build_type: String,
    pub executable: String,
    #[serde(default)]
    pub caches: Value,
    /// Reported as a bool by newer benchmark versions, absent in older ones.
    #[serde(default = "default_cpu_scaling")]
    pub cpu_scaling_enabled: Value,
}

fn default_cpu_scaling() -> Value {
    Value::String("unknown".to_string())
}

/// One iteration or one aggregate of a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub name: String,
    #[serde(default = "default_threads")]
    pub threads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_name: Option<String>,
    #[serde(default)]
    pub repetition_index: u64,
    /// Measurements and anything else the binary emitted.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn default_threads() -> u64 {
    1
}

impl BenchmarkRecord {
    /// Numeric field by name, if present.
    pub fn metric(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate_name.is_some()
    }

    pub fn parsed_name(&self) -> ParsedName {
        parse_name(&self.name, self.aggregate_name.as_deref())
    }
}

/// A parsed benchmark report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub context: BenchmarkContext,
    pub benchmarks: Vec<BenchmarkRecord>,
}

impl BenchmarkReport {
    /// Parse a report from JSON text. `source_name` is used in errors.
    pub fn parse(source_name: &str, content: &str) -> GateResult<Self> {
        let report: BenchmarkReport =
            serde_json::from_str(content).map_err(|e| GateError::ReportParse {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        debug!(
            source = source_name,
            records = report.benchmarks.len(),
            "parsed benchmark report"
        );
        Ok(report)
    }

    /// Read and parse a report file.
    pub fn from_file(path: &Path) -> GateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GateError::ReportParse {
            source_name: path.display().to_string(),
            message: format!("failed to read report: {}", e),
        })?;
        Self::parse(&path.display().to_string(), &content)
    }

    /// Records paired with their parsed names, in report order.
    pub fn parsed_records(&self) -> impl Iterator<Item = (ParsedName, &BenchmarkRecord)> {
        self.benchmarks.iter().map(|r| (r.parsed_name(), r))
    }
}
