mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.name();
    debug!(command, version = env!("CARGO_PKG_VERSION"), "fieldscore starting");

    if let Err(err) = dispatch(cli.command) {
        error!(command, error = %err, "fieldscore command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Merge(args) => commands::merge::run(args),
        Commands::Summary(args) => commands::summary::run(args),
        Commands::MatchLists(args) => commands::match_lists::run(args),
    }
}

// RUST_LOG overrides the default `info` level. Logs go to stderr; stdout
// carries command output.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
