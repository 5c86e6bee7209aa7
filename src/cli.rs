use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "scorecard",
    version,
    about = "Score exported exam response sheets and estimate rank"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Score(ScoreArgs),
    Parse(ParseArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Response sheet HTML, or `-` for stdin.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "default")]
    pub exam: String,

    #[arg(long, default_value = ".cache/scorecard")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub marks_per_correct: Option<f64>,

    #[arg(long)]
    pub negative_per_wrong: Option<f64>,

    #[arg(long)]
    pub scheme_path: Option<PathBuf>,

    #[arg(long, default_value_t = 100_000)]
    pub total_candidates: u64,

    /// Estimate against the stored corpus without adding this sheet to it.
    #[arg(long, default_value_t = false)]
    pub no_record: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/scorecard")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value = "default")]
    pub exam: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
