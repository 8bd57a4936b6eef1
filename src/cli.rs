use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fieldscore::matcher::DEFAULT_MATCH_THRESHOLD;

#[derive(Parser, Debug)]
#[command(
    name = "fieldscore",
    version,
    about = "Aggregate structured-extraction comparison results into field metrics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild totals from a JSON-lines results log.
    Replay(ReplayArgs),
    /// Combine partial checkpoints into one.
    Merge(MergeArgs),
    /// Print the text summary stored in a checkpoint.
    Summary(SummaryArgs),
    /// Match two JSON lists with exact-match similarity.
    MatchLists(MatchListsArgs),
}

impl Commands {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Replay(_) => "replay",
            Commands::Merge(_) => "merge",
            Commands::Summary(_) => "summary",
            Commands::MatchLists(_) => "match-lists",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[arg(long)]
    pub log: PathBuf,

    #[arg(long)]
    pub schema: String,

    #[arg(long)]
    pub checkpoint_out: Option<PathBuf>,

    #[arg(long)]
    pub report_out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_non_matches: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[arg(long)]
    pub schema: String,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub report_out: Option<PathBuf>,

    #[arg(required = true)]
    pub checkpoints: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[arg(long)]
    pub checkpoint: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct MatchListsArgs {
    /// Ground-truth list as inline JSON.
    #[arg(long)]
    pub left: String,

    /// Predicted list as inline JSON.
    #[arg(long)]
    pub right: String,

    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    pub threshold: f64,

    #[arg(long, default_value_t = false)]
    pub no_normalize: bool,
}
