use super::args::*;
use crate::exit_codes::SUCCESS;

pub mod convert;
pub mod run;
pub mod thresholds;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Convert(args) => convert::run(args),
        Command::Thresholds(args) => thresholds::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}

/// Test name for a report file: its stem.
pub(crate) fn test_name(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
