use benchgate_core::benchmark::{group_records, BenchmarkReport};
use benchgate_core::cedar::{check_duplicate_metric_names, emit_cedar_reports, CedarTestReport};
use benchgate_core::perf_report::{PerfReport, PerfReportBuilder};
use benchgate_core::report::write_json;
use benchgate_core::GateResult;

use crate::cli::args::{ConvertArgs, ConvertFormat};
use crate::exit_codes::SUCCESS;

pub fn run(args: ConvertArgs) -> anyhow::Result<i32> {
    let value = match convert(&args) {
        Ok(Converted::Cedar(reports)) => serde_json::to_value(reports)?,
        Ok(Converted::Perf(report)) => serde_json::to_value(report)?,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };
    match &args.out {
        Some(out) => write_json(&value, out)?,
        None => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(SUCCESS)
}

enum Converted {
    Cedar(Vec<CedarTestReport>),
    Perf(PerfReport),
}

fn convert(args: &ConvertArgs) -> GateResult<Converted> {
    let started = chrono::Utc::now().timestamp();
    let mut cedar = Vec::new();
    let mut perf = PerfReportBuilder::default();

    for path in &args.reports {
        let report = BenchmarkReport::from_file(path)?;
        for group in group_records(&report) {
            match args.format {
                ConvertFormat::Cedar => {
                    let reports = emit_cedar_reports(&group)?;
                    check_duplicate_metric_names(&group.name, &reports)?;
                    cedar.extend(reports);
                }
                ConvertFormat::Perf => perf.add_group(group),
            }
        }
    }

    Ok(match args.format {
        ConvertFormat::Cedar => Converted::Cedar(cedar),
        ConvertFormat::Perf => Converted::Perf(perf.build(started, chrono::Utc::now().timestamp())),
    })
}
