use anyhow::Result;
use tracing::info;

use crate::cli::EvaluateArgs;
use crate::evaluation::{EvaluationInputs, evaluate};
use crate::report::save;

pub fn run(args: EvaluateArgs, verbose: bool) -> Result<()> {
    let mut config = args.dataset.config(verbose);
    if let Some(results_dir) = &args.results_dir {
        config.results_dir = results_dir.clone();
    }

    let mut inputs = EvaluationInputs::from_layout(&config, &args.dataset.layout());
    if let Some(path) = args.qu_artifact {
        inputs.qu_artifact = path;
    }
    if let Some(path) = args.ir_artifact {
        inputs.ir_artifact = path;
    }

    let bundle = evaluate(args.scope, &inputs, &config)?;
    let written = save(&bundle, &config.results_dir, &args.tag)?;

    info!(
        scope = ?args.scope,
        reports = written.len(),
        results_dir = %config.results_dir.display(),
        "evaluation complete"
    );
    Ok(())
}
