use anyhow::Result;
use tracing::info;

use crate::cli::SignificanceArgs;
use crate::model::QuestionType;
use crate::significance::write_significance_files;
use crate::store::{GeneratedSources, load_generated, load_gold};

pub fn run(args: SignificanceArgs, verbose: bool) -> Result<()> {
    let config = args.dataset.config(verbose);
    let layout = args.dataset.layout();
    let gold = load_gold(&config.gold_path)?;

    let generated = load_generated(&GeneratedSources {
        artifact: None,
        predictions: [QuestionType::Factoid, QuestionType::YesNo]
            .into_iter()
            .map(|question_type| (question_type, layout.predictions(question_type)))
            .collect(),
        ranked: Vec::new(),
    })?;

    let files = write_significance_files(&gold, &generated, &layout)?;
    for file in &files {
        info!(
            set = ?file.set,
            correct = file.correct,
            questions = file.questions,
            "significance summary"
        );
    }
    Ok(())
}
