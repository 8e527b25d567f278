//! Benchmark report aggregation and performance threshold gating.
//!
//! Google Benchmark JSON reports are grouped by base benchmark and thread
//! level, projected into Cedar performance reports, and checked against the
//! per-variant thresholds of a YAML policy. [`hook::BenchmarkHook`] drives
//! the whole pipeline across a suite.

pub mod benchmark;
pub mod cedar;
pub mod config;
pub mod errors;
pub mod hook;
pub mod override_gate;
pub mod perf_report;
pub mod report;
pub mod thresholds;

pub use config::{Expansions, GateConfig};
pub use errors::{GateError, GateResult};
pub use hook::{BenchmarkHook, BenchmarkTestCase, SuiteOutcome, TestOutcome, ThresholdCheck};
pub use override_gate::{CommentKind, CommentSource, OverrideGate, ReviewComment};
