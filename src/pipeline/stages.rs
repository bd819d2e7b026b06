use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::Stage;
use super::collaborators::{AnswerExtractor, DocumentSearcher, QuestionAnalyzer};
use crate::error::EvalError;
use crate::model::{PendingQuestion, QaData, QaInput, QaItem, QaParagraph, QuestionType};
use crate::store::artifact::{
    ArtifactQuestion, QuestionProcessing, Retrieval, StageArtifact, read_artifact, write_artifact,
};
use crate::util::{ensure_directory, write_json_pretty};

/// Fails with `StagePrecondition` when a stage's input artifact is absent.
pub fn require_input(stage: Stage, path: &Path) -> Result<(), EvalError> {
    if path.exists() {
        Ok(())
    } else {
        Err(EvalError::StagePrecondition {
            stage,
            path: path.to_path_buf(),
        })
    }
}

/// Polls until `path` exists, giving up after `timeout`.
pub fn wait_for_artifact(path: &Path, timeout: Duration, poll: Duration) -> Result<(), EvalError> {
    let started = Instant::now();
    loop {
        if path.exists() {
            debug!(path = %path.display(), waited_ms = started.elapsed().as_millis() as u64, "artifact appeared");
            return Ok(());
        }
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(EvalError::StageTimeout {
                path: path.to_path_buf(),
                waited,
            });
        }
        thread::sleep(poll.min(timeout - waited));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTally {
    pub processed: usize,
    pub skipped: usize,
}

/// Builds the QU artifact for `questions`. A question the analyzer cannot
/// handle is logged and left out.
pub fn understand_questions(
    questions: &[PendingQuestion],
    analyzer: &dyn QuestionAnalyzer,
) -> (StageArtifact, StageTally) {
    let mut tally = StageTally::default();
    let mut artifact = StageArtifact::default();

    for question in questions {
        match analyzer.analyze(&question.body) {
            Ok(analysis) => {
                debug!(
                    question_id = %question.id,
                    question_type = %analysis.question_type,
                    entities = analysis.entities.len(),
                    "question analysed"
                );
                artifact.questions.push(ArtifactQuestion {
                    id: question.id.clone(),
                    body: question.body.clone(),
                    processing: Some(QuestionProcessing::from_entities(
                        analysis.question_type.as_str(),
                        analysis.entities,
                    )),
                    retrieval: Some(Retrieval::default()),
                });
                tally.processed += 1;
            }
            Err(err) => {
                warn!(question_id = %question.id, error = %err, "question analysis failed; skipping");
                tally.skipped += 1;
            }
        }
    }

    (artifact, tally)
}

pub fn run_question_understanding(
    questions: &[PendingQuestion],
    analyzer: &dyn QuestionAnalyzer,
    output: &Path,
) -> Result<StageTally> {
    let (artifact, tally) = understand_questions(questions, analyzer);
    write_artifact(output, &artifact)?;
    info!(
        path = %output.display(),
        processed = tally.processed,
        skipped = tally.skipped,
        "QU stage complete"
    );
    Ok(tally)
}

/// Query sent to the searcher: the QU query, or the question body when the
/// query is blank.
pub fn retrieval_query(question: &ArtifactQuestion) -> &str {
    question
        .processing
        .as_ref()
        .map(|processing| processing.query.trim())
        .filter(|query| !query.is_empty())
        .unwrap_or(question.body.trim())
}

pub fn retrieve_documents(
    artifact: &mut StageArtifact,
    searcher: &dyn DocumentSearcher,
    limit: usize,
) -> StageTally {
    let mut tally = StageTally::default();

    for question in &mut artifact.questions {
        let query = retrieval_query(question).to_string();
        let results = match searcher.search(&query, limit) {
            Ok(mut results) => {
                results.truncate(limit);
                tally.processed += 1;
                results
            }
            Err(err) => {
                warn!(question_id = %question.id, error = %err, "search failed; leaving IR empty");
                tally.skipped += 1;
                Vec::new()
            }
        };
        debug!(question_id = %question.id, query = %query, results = results.len(), "documents retrieved");
        question.retrieval = Some(Retrieval {
            query_used: Some(query),
            results,
        });
    }

    tally
}

pub fn run_information_retrieval(
    input: &Path,
    output: &Path,
    searcher: &dyn DocumentSearcher,
    limit: usize,
) -> Result<StageTally> {
    require_input(Stage::InformationRetrieval, input)?;
    let mut artifact = read_artifact(input)?;
    let tally = retrieve_documents(&mut artifact, searcher, limit);
    write_artifact(output, &artifact)?;
    info!(
        input = %input.display(),
        path = %output.display(),
        processed = tally.processed,
        skipped = tally.skipped,
        "IR stage complete"
    );
    Ok(tally)
}

/// Retrieved abstracts joined by a space.
pub fn answer_context(question: &ArtifactQuestion) -> String {
    question
        .retrieval
        .as_ref()
        .map(|retrieval| {
            retrieval
                .results
                .iter()
                .map(|document| document.abstract_text.trim())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Groups IR-stage questions into one SQuAD-style input per answerable type.
/// Summary and untyped questions are logged and counted as skipped.
pub fn build_qa_inputs(artifact: &StageArtifact) -> (BTreeMap<QuestionType, QaInput>, StageTally) {
    let mut tally = StageTally::default();
    let mut paragraphs = BTreeMap::<QuestionType, Vec<QaParagraph>>::new();

    for question in &artifact.questions {
        let raw_type = question
            .processing
            .as_ref()
            .map(|processing| processing.question_type.as_str())
            .unwrap_or_default();
        let question_type = match raw_type.parse::<QuestionType>() {
            Ok(QuestionType::Summary) => {
                let err = EvalError::UnsupportedAnswerType(QuestionType::Summary);
                warn!(question_id = %question.id, error = %err, "skipping question");
                tally.skipped += 1;
                continue;
            }
            Ok(value) => value,
            Err(err) => {
                warn!(question_id = %question.id, error = %err, "skipping question");
                tally.skipped += 1;
                continue;
            }
        };

        paragraphs
            .entry(question_type)
            .or_default()
            .push(QaParagraph {
                context: answer_context(question),
                qas: vec![QaItem {
                    id: question.id.clone(),
                    question: question.body.clone(),
                }],
            });
        tally.processed += 1;
    }

    let inputs = paragraphs
        .into_iter()
        .map(|(question_type, paragraphs)| {
            (
                question_type,
                QaInput {
                    data: vec![QaData { paragraphs }],
                },
            )
        })
        .collect();
    (inputs, tally)
}

/// Settings for the QA hand-off to the extractor processes.
#[derive(Debug, Clone, Copy)]
pub struct AnswerWait {
    pub timeout: Duration,
    pub poll: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct QaOutcome {
    pub predictions: Vec<(QuestionType, PathBuf)>,
    pub tally: StageTally,
}

/// Writes `qa_input.json` per answer type, launches the extractor and waits
/// for its `predictions.json`.
pub fn run_question_answering(
    input: &Path,
    layout: &super::GenerationLayout,
    extractor: &dyn AnswerExtractor,
    wait: AnswerWait,
) -> Result<QaOutcome> {
    require_input(Stage::QuestionAnswering, input)?;
    let artifact = read_artifact(input)?;
    let (inputs, tally) = build_qa_inputs(&artifact);

    let mut outcome = QaOutcome {
        predictions: Vec::new(),
        tally,
    };

    for (question_type, qa_input) in inputs {
        let path = extract_answers(question_type, &qa_input, layout, extractor, wait)?;
        outcome.predictions.push((question_type, path));
    }

    info!(
        input = %input.display(),
        answer_types = outcome.predictions.len(),
        processed = outcome.tally.processed,
        skipped = outcome.tally.skipped,
        "QA stage complete"
    );
    Ok(outcome)
}

/// Hands one answer type's questions to the extractor and waits for its
/// `predictions.json`. Returns the predictions path.
pub fn extract_answers(
    question_type: QuestionType,
    qa_input: &QaInput,
    layout: &super::GenerationLayout,
    extractor: &dyn AnswerExtractor,
    wait: AnswerWait,
) -> Result<PathBuf> {
    let output_dir = layout.qa_dir(question_type);
    ensure_directory(&output_dir)?;
    let input_path = layout.qa_input(question_type);
    let predictions_path = layout.predictions(question_type);

    if predictions_path.exists() {
        fs::remove_file(&predictions_path)
            .with_context(|| format!("failed to remove stale {}", predictions_path.display()))?;
    }
    write_json_pretty(&input_path, qa_input)?;

    let questions = qa_input
        .data
        .iter()
        .map(|data| data.paragraphs.len())
        .sum::<usize>();
    info!(
        question_type = %question_type,
        questions,
        input = %input_path.display(),
        "launching answer extractor"
    );

    let launched = extractor.launch(question_type, &input_path, &output_dir)?;
    if let Err(err) = wait_for_artifact(&predictions_path, wait.timeout, wait.poll) {
        launched.abandon();
        return Err(err.into());
    }
    launched.reap()?;

    info!(question_type = %question_type, path = %predictions_path.display(), "predictions written");
    Ok(predictions_path)
}
