use anyhow::Result;
use tracing::{info, warn};

use super::ExternalCollaborators;
use crate::cli::PipelineArgs;
use crate::evaluation::{EvalScope, EvaluationInputs, evaluate};
use crate::model::PendingQuestion;
use crate::pipeline::{GoldSubstitution, Orchestrator, RunMode, Stage};
use crate::report::save;
use crate::store::{load_gold, load_question_list};

pub fn run(args: PipelineArgs, verbose: bool) -> Result<()> {
    let mut config = args.dataset.config(verbose);
    args.collaborators.apply(&mut config);
    let layout = args.dataset.layout();

    let substitution = GoldSubstitution {
        qu: args.gold_qu,
        ir: args.gold_ir,
    };
    let needs_gold = substitution.is_active()
        || args.evaluate
        || (args.mode.includes(Stage::QuestionUnderstanding) && args.questions.is_none());
    let gold = if needs_gold {
        Some(load_gold(&config.gold_path)?)
    } else {
        None
    };

    let questions = match (&args.questions, &gold) {
        (Some(path), _) => load_question_list(path)?,
        (None, Some(gold)) if args.mode.includes(Stage::QuestionUnderstanding) => gold
            .iter()
            .map(|record| PendingQuestion {
                id: record.id.clone(),
                body: record.body.clone(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let external = ExternalCollaborators::from_args(&args.collaborators)?;
    let mut orchestrator = Orchestrator::new(&config, layout.clone(), external.collaborators());
    if let Some(gold) = &gold {
        orchestrator = orchestrator.with_gold(gold, substitution);
    }

    let report = orchestrator.run(args.mode, &questions)?;
    for (stage, tally) in report.tallies() {
        if tally.skipped > 0 {
            warn!(
                stage = stage.as_str(),
                processed = tally.processed,
                skipped = tally.skipped,
                "questions skipped"
            );
        }
    }
    info!(
        mode = ?args.mode,
        stages = report.stages.len(),
        qa_input = %report.qa_input.display(),
        "pipeline finished"
    );

    if args.evaluate {
        let mut inputs = EvaluationInputs::from_layout(&config, &layout);
        inputs.qu_artifact = report.ir_input.clone();
        inputs.ir_artifact = report.qa_input.clone();
        let bundle = evaluate(scope_for(args.mode), &inputs, &config)?;
        save(&bundle, &config.results_dir, &args.tag)?;
    }

    Ok(())
}

/// Evaluation scope matching the last stage a mode runs.
fn scope_for(mode: RunMode) -> EvalScope {
    match mode {
        RunMode::Full => EvalScope::All,
        RunMode::QuOnly => EvalScope::Qu,
        RunMode::IrOnly | RunMode::QuIr => EvalScope::Ir,
        RunMode::QaOnly | RunMode::IrQa => EvalScope::Qa,
    }
}
