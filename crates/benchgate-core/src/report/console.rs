use super::{StatusCounts, TestResultRow, TestStatus};

/// Render one line per row followed by a totals line.
pub fn format_summary(rows: &[TestResultRow]) -> String {
    let mut out = String::new();
    for r in rows {
        let indent = if r.parent.is_some() { "  " } else { "" };
        out.push_str(&format!(
            "{}{:<5} {}",
            indent,
            r.status.as_str().to_uppercase(),
            r.test_id
        ));
        if r.status != TestStatus::Pass && !r.message.is_empty() {
            // Violation messages span several lines; keep them under the row.
            for line in r.message.lines() {
                out.push_str(&format!("\n{}      {}", indent, line));
            }
        }
        out.push('\n');
    }
    let c = StatusCounts::from_rows(rows);
    out.push_str(&format!(
        "Results: pass={} warn={} fail={} error={}\n",
        c.pass, c.warn, c.fail, c.error
    ));
    out
}

pub fn print_summary(rows: &[TestResultRow]) {
    eprint!("{}", format_summary(rows));
}
