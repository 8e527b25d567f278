use std::path::Path;
use std::sync::Arc;

use benchgate_core::config::DEFAULT_CONFIG_FILE;
use benchgate_core::report::junit::write_junit;
use benchgate_core::report::{console, StatusCounts};
use benchgate_core::{
    BenchmarkHook, BenchmarkTestCase, Expansions, GateConfig, GateError, GateResult,
};
use benchgate_review::{GithubCommentSource, ReviewConfig};
use tracing::{info, warn};

use super::test_name;
use crate::cli::args::RunArgs;
use crate::exit_codes::{CONSISTENCY_ERROR, SUCCESS, TEST_FAILED};

const JUNIT_SUITE: &str = "benchgate";

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let (config, expansions) = match load_inputs(&args) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    let mut hook = BenchmarkHook::new(config, expansions.clone());
    if expansions.is_merge_queue() {
        if let Some(source) = comment_source(&expansions) {
            hook = hook.with_comment_source(Arc::new(source));
        }
    }

    if let Err(e) = hook.before_suite() {
        eprintln!("error: {e}");
        return Ok(e.exit_code());
    }

    for path in &args.reports {
        let test = BenchmarkTestCase::new(test_name(path), path);
        // Failures are recorded on the hook; the suite keeps going.
        if let Ok(outcome) = hook.after_test(&test).await {
            info!(
                test = %outcome.test_name,
                status = outcome.status().as_str(),
                cedar_reports = outcome.cedar_reports,
                "test finished"
            );
        }
    }

    let suite = hook.after_suite();

    console::print_summary(hook.results());
    if let Some(junit) = &args.junit {
        if let Err(e) = write_junit(JUNIT_SUITE, hook.results(), junit) {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    }

    match suite {
        Ok(outcome) => {
            eprintln!(
                "Wrote {} Cedar report(s) to {}",
                outcome.cedar_reports,
                outcome.cedar_report_file.display()
            );
        }
        Err(e @ GateError::Consistency { .. }) => {
            eprintln!("error: {e}");
            return Ok(CONSISTENCY_ERROR);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    }

    if StatusCounts::from_rows(hook.results()).has_failures() {
        Ok(TEST_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn load_inputs(args: &RunArgs) -> GateResult<(GateConfig, Expansions)> {
    let mut config = match &args.config {
        Some(path) => GateConfig::load(path)?,
        None => GateConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    if let Some(out) = &args.cedar_out {
        config.cedar_report_file = out.clone();
    }

    let from_file = match &args.expansions {
        Some(path) => Expansions::from_file(path)?,
        None => Expansions::default(),
    };
    Ok((config, from_file.overlay(Expansions::from_env())))
}

/// GitHub client for override lookups. Without one, a merge-queue run
/// with violations fails with a missing-context error.
fn comment_source(expansions: &Expansions) -> Option<GithubCommentSource> {
    let token = expansions.github_token.as_deref()?;
    match GithubCommentSource::new(ReviewConfig::from_env().with_token(token)) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!(error = %e, "cannot create GitHub client; overrides unavailable");
            None
        }
    }
}
