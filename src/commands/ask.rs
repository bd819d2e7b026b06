use std::io::{self, Write};

use anyhow::{Context, Result};

use super::ExternalCollaborators;
use crate::cli::AskArgs;
use crate::pipeline::Orchestrator;

pub fn run(args: AskArgs, verbose: bool) -> Result<()> {
    let mut config = args.dataset.config(verbose);
    args.collaborators.apply(&mut config);

    let external = ExternalCollaborators::from_args(&args.collaborators)?;
    let orchestrator = Orchestrator::new(&config, args.dataset.layout(), external.collaborators());
    let answer = orchestrator.ask(&args.question)?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &answer).context("failed to print answer")?;
    writeln!(stdout).context("failed to print answer")?;
    Ok(())
}
