//! Scores a generation folder against the gold dataset, one stage family at
//! a time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EvaluationConfig;
use crate::model::QuestionType;
use crate::pipeline::GenerationLayout;
use crate::report::{InputDigest, ResultsBundle};
use crate::scoring::{
    SetField, count_unmatched_generated, evaluate_question_types, evaluate_set_field,
    score_answers,
};
use crate::store::{GeneratedSources, LoadTally, RecordSet, load_generated, load_gold};

/// Which stage outputs to score.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalScope {
    All,
    Qu,
    Ir,
    Qa,
}

impl EvalScope {
    fn covers(self, other: EvalScope) -> bool {
        self == EvalScope::All || self == other
    }
}

/// Files an evaluation reads.
#[derive(Debug, Clone)]
pub struct EvaluationInputs {
    pub gold: PathBuf,
    pub qu_artifact: PathBuf,
    pub ir_artifact: PathBuf,
    pub answers: GeneratedSources,
}

impl EvaluationInputs {
    pub fn from_layout(config: &EvaluationConfig, layout: &GenerationLayout) -> Self {
        Self {
            gold: config.gold_path.clone(),
            qu_artifact: layout.qu_output(),
            ir_artifact: layout.ir_output(),
            answers: layout.answer_sources(),
        }
    }
}

pub fn evaluate(
    scope: EvalScope,
    inputs: &EvaluationInputs,
    config: &EvaluationConfig,
) -> Result<ResultsBundle> {
    let gold = load_gold(&inputs.gold)?;
    let mut bundle = ResultsBundle::new(config);
    bundle.diagnostics.gold = gold.tally();
    bundle
        .diagnostics
        .inputs
        .push(InputDigest::from_path("gold", &inputs.gold)?);

    info!(
        scope = ?scope,
        gold = %inputs.gold.display(),
        dataset_variant = config.dataset_variant.as_str(),
        questions = gold.len(),
        "evaluation started"
    );

    if scope.covers(EvalScope::Qu) {
        let generated = load_artifact_records(&inputs.qu_artifact, &mut bundle)
            .context("failed to load QU output")?;
        bundle.concepts = Some(evaluate_set_field(
            SetField::Concepts,
            &gold,
            &generated,
            config,
        ));
        bundle.question_types = Some(evaluate_question_types(&gold, &generated, config));
    }

    if scope.covers(EvalScope::Ir) {
        let generated = load_artifact_records(&inputs.ir_artifact, &mut bundle)
            .context("failed to load IR output")?;
        bundle.documents = Some(evaluate_set_field(
            SetField::Documents,
            &gold,
            &generated,
            config,
        ));
    }

    if scope.covers(EvalScope::Qa) {
        evaluate_answers(&gold, inputs, config, &mut bundle)?;
    }

    Ok(bundle)
}

fn load_artifact_records(path: &Path, bundle: &mut ResultsBundle) -> Result<RecordSet> {
    let generated = load_generated(&GeneratedSources {
        artifact: Some(path.to_path_buf()),
        ..GeneratedSources::default()
    })?;
    merge_tally(&mut bundle.diagnostics.generated, generated.tally());
    bundle
        .diagnostics
        .inputs
        .push(InputDigest::from_path("stage_artifact", path)?);
    Ok(generated)
}

fn evaluate_answers(
    gold: &RecordSet,
    inputs: &EvaluationInputs,
    config: &EvaluationConfig,
    bundle: &mut ResultsBundle,
) -> Result<()> {
    let sources = GeneratedSources {
        artifact: None,
        predictions: inputs.answers.predictions.clone(),
        ranked: inputs.answers.ranked.clone(),
    };
    let generated = load_generated(&sources).context("failed to load generated answers")?;
    merge_tally(&mut bundle.diagnostics.generated, generated.tally());

    for (role, files) in [("predictions", &sources.predictions), ("ranked_answers", &sources.ranked)] {
        for (_, path) in files.iter().filter(|(_, path)| path.exists()) {
            bundle.diagnostics.inputs.push(InputDigest::from_path(role, path)?);
        }
    }

    let unsupported = gold
        .iter()
        .filter(|record| record.question_type == Some(QuestionType::Summary))
        .count();
    if unsupported > 0 {
        warn!(
            questions = unsupported,
            question_type = %QuestionType::Summary,
            "answer type has no scorer; questions excluded"
        );
    }
    bundle.diagnostics.unsupported_answer_type = unsupported;

    count_unmatched_generated(gold, &generated, "answers");

    for question_type in QuestionType::ANSWERABLE {
        let report = score_answers(question_type, gold, &generated, config)?;
        bundle.add_answer_report(report);
    }
    Ok(())
}

fn merge_tally(total: &mut LoadTally, other: LoadTally) {
    total.records += other.records;
    total.duplicates += other.duplicates;
    total.rejected += other.rejected;
}
