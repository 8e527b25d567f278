//! Benchmark name parsing.
//!
//! Google Benchmark encodes a record's identity in its name:
//!
//! ```text
//! Suite/BM_Foo                      base=Suite/BM_Foo  threads=1
//! Suite/BM_Foo/arg:100              base=Suite/BM_Foo/arg:100  threads=1
//! Suite/BM_Foo/threads:8            base=Suite/BM_Foo  threads=8
//! Suite/BM_Foo/threads:8_mean       base=Suite/BM_Foo  threads=8  aggregate=mean
//! Suite/BM_Foo_mean                 base=Suite/BM_Foo  threads=1  aggregate=mean
//! ```
//!
//! The aggregate suffix is only stripped when the record's `aggregate_name`
//! field confirms it, so a benchmark that happens to be called `BM_Scan_mean`
//! is never mis-parsed.

use serde::Serialize;

const THREADS_PREFIX: &str = "threads:";

/// Thread count used when a name carries no `threads:N` segment.
pub const DEFAULT_THREAD_COUNT: &str = "1";

/// Identity recovered from a benchmark name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParsedName {
    pub base_name: String,
    /// Verbatim `threads:` tag; not necessarily an integer.
    pub thread_count: String,
    pub aggregate_kind: Option<String>,
}

impl ParsedName {
    /// Rebuild the name this was parsed from.
    ///
    /// The `threads:` segment is only emitted when it was explicit in the
    /// original name, which the caller signals via `explicit_threads`.
    pub fn to_name(&self, explicit_threads: bool) -> String {
        let mut name = self.base_name.clone();
        if explicit_threads {
            name.push('/');
            name.push_str(THREADS_PREFIX);
            name.push_str(&self.thread_count);
        }
        if let Some(agg) = &self.aggregate_kind {
            name.push('_');
            name.push_str(agg);
        }
        name
    }
}

/// Split a benchmark name into `(base, thread count, aggregate kind)`.
pub fn parse_name(name: &str, aggregate_name: Option<&str>) -> ParsedName {
    let (stem, aggregate_kind) = strip_aggregate(name, aggregate_name);

    let (base_name, thread_count) = match stem.rsplit_once('/') {
        Some((head, last)) if last.starts_with(THREADS_PREFIX) => {
            (head, &last[THREADS_PREFIX.len()..])
        }
        _ => (stem, DEFAULT_THREAD_COUNT),
    };

    ParsedName {
        base_name: base_name.to_string(),
        thread_count: thread_count.to_string(),
        aggregate_kind,
    }
}

/// Whether the name carries an explicit `threads:N` segment.
pub fn has_explicit_threads(name: &str, aggregate_name: Option<&str>) -> bool {
    let (stem, _) = strip_aggregate(name, aggregate_name);
    stem.rsplit_once('/')
        .map(|(_, last)| last.starts_with(THREADS_PREFIX))
        .unwrap_or(false)
}

fn strip_aggregate<'a>(name: &'a str, aggregate_name: Option<&str>) -> (&'a str, Option<String>) {
    let Some(agg) = aggregate_name.filter(|a| !a.is_empty()) else {
        return (name, None);
    };
    match name.strip_suffix(agg).and_then(|s| s.strip_suffix('_')) {
        Some(stem) => (stem, Some(agg.to_string())),
        None => (name, None),
    }
}
