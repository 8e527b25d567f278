use std::path::Path;

use super::{StatusCounts, TestResultRow, TestStatus};
use crate::errors::{GateError, GateResult};

pub fn render_junit(suite: &str, results: &[TestResultRow]) -> String {
    let counts = StatusCounts::from_rows(results);
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="{}">"#,
        escape(suite),
        results.len(),
        counts.fail,
        counts.error,
        counts.warn
    ));
    xml.push('\n');

    for r in results {
        let classname = r.parent.as_deref().unwrap_or(suite);
        xml.push_str(&format!(
            r#"  <testcase classname="{}" name="{}">"#,
            escape(classname),
            escape(&r.test_id)
        ));
        match r.status {
            TestStatus::Pass => {}
            TestStatus::Warn => {
                xml.push_str(&format!(r#"<skipped message="{}"/>"#, escape(&r.message)))
            }
            TestStatus::Fail => {
                xml.push_str(&format!(r#"<failure message="{}"/>"#, escape(&r.message)))
            }
            TestStatus::Error => {
                xml.push_str(&format!(r#"<error message="{}"/>"#, escape(&r.message)))
            }
        }
        xml.push_str("</testcase>\n");
    }

    xml.push_str("</testsuite>\n");
    xml
}

pub fn write_junit(suite: &str, results: &[TestResultRow], out: &Path) -> GateResult<()> {
    let write_err = |message: String| GateError::ReportWrite {
        path: out.to_path_buf(),
        message,
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    std::fs::write(out, render_junit(suite, results)).map_err(|e| write_err(e.to_string()))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junit_statuses() {
        let rows = vec![
            TestResultRow::new("bm_a", TestStatus::Pass, ""),
            TestResultRow::subtest("bm_a", TestStatus::Fail, "value > \"bound\""),
            TestResultRow::subtest("bm_b", TestStatus::Warn, "overridden"),
        ];
        let xml = render_junit("benchmarks", &rows);
        assert!(xml.contains(r#"tests="3" failures="1" errors="0" skipped="1""#));
        assert!(xml.contains(r#"classname="bm_a" name="bm_a:check_perf_thresholds""#));
        assert!(xml.contains("&gt; &quot;bound&quot;"));
        assert!(xml.contains(r#"<skipped message="overridden"/>"#));
    }
}
