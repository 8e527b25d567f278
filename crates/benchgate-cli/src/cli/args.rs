use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "benchgate",
    version,
    about = "Aggregate Google Benchmark reports into Cedar and gate them on performance thresholds"
)]
pub struct Cli {
    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the suite hook over benchmark reports and check thresholds
    Run(RunArgs),
    /// Convert benchmark reports to Cedar or the legacy perf report
    Convert(ConvertArgs),
    /// Validate a threshold policy file and list its rules
    Thresholds(ThresholdsArgs),
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Gate configuration file (defaults apply if benchgate.yaml is absent)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Build expansions YAML; BENCHGATE_* variables take precedence
    #[arg(long)]
    pub expansions: Option<PathBuf>,

    /// Override the Cedar output path from the config
    #[arg(long)]
    pub cedar_out: Option<PathBuf>,

    /// Also write results as JUnit XML
    #[arg(long)]
    pub junit: Option<PathBuf>,

    /// Benchmark JSON reports; each file is one test named after its stem
    #[arg(required = true)]
    pub reports: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConvertFormat {
    Cedar,
    Perf,
}

#[derive(Parser, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long, value_enum, default_value_t = ConvertFormat::Cedar)]
    pub format: ConvertFormat,

    /// Output file (stdout if omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(required = true)]
    pub reports: Vec<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct ThresholdsArgs {
    #[arg(long, default_value = benchgate_core::thresholds::DEFAULT_THRESHOLDS_FILE)]
    pub file: PathBuf,

    /// Only list rules for this build variant
    #[arg(long)]
    pub variant: Option<String>,
}
