mod cli;
mod commands;
mod config;
mod error;
mod evaluation;
mod model;
mod pipeline;
mod report;
mod scoring;
mod significance;
mod store;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let verbose = cli.verbose;

    match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run(args, verbose),
        Commands::Pipeline(args) => commands::pipeline::run(args, verbose),
        Commands::Ask(args) => commands::ask::run(args, verbose),
        Commands::GoldArtifacts(args) => commands::gold_artifacts::run(args, verbose),
        Commands::Significance(args) => commands::significance::run(args, verbose),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
