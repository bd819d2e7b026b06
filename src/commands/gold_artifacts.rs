use anyhow::Result;
use tracing::info;

use crate::cli::GoldArtifactsArgs;
use crate::pipeline::IrSubstitution;
use crate::pipeline::gold::{write_gold_ir, write_gold_qu};
use crate::store::load_gold;

pub fn run(args: GoldArtifactsArgs, verbose: bool) -> Result<()> {
    let config = args.dataset.config(verbose);
    let layout = args.dataset.layout();
    let gold = load_gold(&config.gold_path)?;

    let gold_qu = write_gold_qu(&layout, &gold)?;
    let base = args.base.unwrap_or_else(|| gold_qu.clone());

    let mut written = vec![gold_qu];
    for variant in [IrSubstitution::Abstracts, IrSubstitution::Snippets] {
        written.push(write_gold_ir(
            &layout,
            &gold,
            &base,
            variant,
            config.snippet_limit,
        )?);
    }

    info!(
        root = %layout.root().display(),
        artifacts = written.len(),
        "gold artifacts written"
    );
    Ok(())
}
