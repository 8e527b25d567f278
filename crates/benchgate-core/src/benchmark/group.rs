//! Grouping of benchmark records by base name and thread count.

use super::{BenchmarkContext, BenchmarkRecord, BenchmarkReport};

/// All records of one base benchmark, bucketed by thread count.
///
/// Buckets keep first-seen order, and records within a bucket keep arrival
/// order, so downstream output follows the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadGroupReport {
    pub name: String,
    pub context: BenchmarkContext,
    buckets: Vec<(String, Vec<BenchmarkRecord>)>,
}

impl ThreadGroupReport {
    pub fn new(name: impl Into<String>, context: BenchmarkContext) -> Self {
        Self {
            name: name.into(),
            context,
            buckets: Vec::new(),
        }
    }

    /// Append a record to its thread-count bucket.
    pub fn add_record(&mut self, thread_count: &str, record: BenchmarkRecord) {
        match self.buckets.iter_mut().find(|(t, _)| t == thread_count) {
            Some((_, records)) => records.push(record),
            None => self.buckets.push((thread_count.to_string(), vec![record])),
        }
    }

    /// Merge another group for the same base name into this one.
    pub fn extend(&mut self, other: ThreadGroupReport) {
        for (thread_count, records) in other.buckets {
            for record in records {
                self.add_record(&thread_count, record);
            }
        }
    }

    pub fn thread_counts(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(t, _)| t.as_str())
    }

    pub fn records(&self, thread_count: &str) -> &[BenchmarkRecord] {
        self.buckets
            .iter()
            .find(|(t, _)| t == thread_count)
            .map(|(_, r)| r.as_slice())
            .unwrap_or(&[])
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[BenchmarkRecord])> {
        self.buckets.iter().map(|(t, r)| (t.as_str(), r.as_slice()))
    }

    /// Iteration records of a bucket.
    pub fn iterations(&self, thread_count: &str) -> impl Iterator<Item = &BenchmarkRecord> {
        self.records(thread_count).iter().filter(|r| !r.is_aggregate())
    }

    /// Aggregate records of a bucket.
    pub fn aggregates(&self, thread_count: &str) -> impl Iterator<Item = &BenchmarkRecord> {
        self.records(thread_count).iter().filter(|r| r.is_aggregate())
    }
}

/// Group every record of a report by base name, in first-seen order.
pub fn group_records(report: &BenchmarkReport) -> Vec<ThreadGroupReport> {
    let mut groups: Vec<ThreadGroupReport> = Vec::new();

    for (parsed, record) in report.parsed_records() {
        let idx = match groups.iter().position(|g| g.name == parsed.base_name) {
            Some(idx) => idx,
            None => {
                groups.push(ThreadGroupReport::new(
                    parsed.base_name.clone(),
                    report.context.clone(),
                ));
                groups.len() - 1
            }
        };
        groups[idx].add_record(&parsed.thread_count, record.clone());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BenchmarkReport {
        serde_json::from_str(
            r#"{
            "context": {"date": "d", "num_cpus": 4, "mhz_per_cpu": 3000,
                        "library_build_type": "release", "executable": "bm", "caches": []},
            "benchmarks": [
                {"name": "S/BM_A/threads:1", "threads": 1, "repetition_index": 0, "cpu_time": 1.0},
                {"name": "S/BM_A/threads:2", "threads": 2, "repetition_index": 0, "cpu_time": 2.0},
                {"name": "S/BM_B", "threads": 1, "cpu_time": 5.0},
                {"name": "S/BM_A/threads:1", "threads": 1, "repetition_index": 1, "cpu_time": 1.5},
                {"name": "S/BM_A/threads:1_mean", "threads": 1, "aggregate_name": "mean", "cpu_time": 1.25}
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_groups_by_base_name_in_first_seen_order() {
        let groups = group_records(&report());
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["S/BM_A", "S/BM_B"]);

        let a = &groups[0];
        assert_eq!(a.thread_counts().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(a.records("1").len(), 3);
        assert_eq!(a.iterations("1").count(), 2);
        assert_eq!(a.aggregates("1").count(), 1);
        assert!(a.records("8").is_empty());
    }

    #[test]
    fn test_arrival_order_preserved_within_bucket() {
        let groups = group_records(&report());
        let indices: Vec<u64> = groups[0]
            .iterations("1")
            .map(|r| r.repetition_index)
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_extend_merges_buckets() {
        let mut groups = group_records(&report());
        let extra = groups[0].clone();
        groups[0].extend(extra);
        assert_eq!(groups[0].records("1").len(), 6);
        assert_eq!(groups[0].records("2").len(), 2);
    }
}
