use benchgate_core::thresholds::{PerformanceThresholds, ThresholdTable};

use crate::cli::args::ThresholdsArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: ThresholdsArgs) -> anyhow::Result<i32> {
    let policy = match PerformanceThresholds::from_file(&args.file) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    let variants = match &args.variant {
        Some(v) => vec![v.clone()],
        None => policy.variants(),
    };

    println!("{}", args.file.display());
    for variant in &variants {
        let table = ThresholdTable::from_policy(&args.file, &policy, Some(variant));
        let total: usize = table.tests().map(|(_, rules)| rules.len()).sum();
        println!("  {variant}: {total} rule(s)");
        for (test, rules) in table.tests() {
            println!("    {test}: {}", rules.len());
        }
    }
    Ok(SUCCESS)
}
