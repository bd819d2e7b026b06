use serde::Serialize;
use tracing::{debug, info};

use super::matching::{Score, ScoreOutcome, normalized_set, score_sets};
use super::{count_unmatched_generated, log_missing_generated};
use crate::config::EvaluationConfig;
use crate::model::QuestionRecord;
use crate::store::RecordSet;

/// Multi-valued record fields scored by set overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetField {
    Concepts,
    Documents,
}

impl SetField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concepts => "concepts",
            Self::Documents => "documents",
        }
    }

    fn values(self, record: &QuestionRecord) -> &[String] {
        match self {
            Self::Concepts => &record.concepts,
            Self::Documents => &record.documents,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionScore {
    pub id: String,
    #[serde(flatten)]
    pub outcome: ScoreOutcome,
}

/// How every gold question was disposed of. The fields sum to the gold
/// corpus size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentinelTally {
    pub scored: usize,
    pub no_prediction: usize,
    pub no_gold_answer: usize,
    pub no_gold_and_no_prediction: usize,
    pub missing_generated: usize,
}

impl SentinelTally {
    pub fn record(&mut self, outcome: &ScoreOutcome) {
        match outcome {
            ScoreOutcome::Scored(_) => self.scored += 1,
            ScoreOutcome::NoPrediction => self.no_prediction += 1,
            ScoreOutcome::NoGoldAnswer => self.no_gold_answer += 1,
            ScoreOutcome::NoGoldAndNoPrediction => self.no_gold_and_no_prediction += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.scored
            + self.no_prediction
            + self.no_gold_answer
            + self.no_gold_and_no_prediction
            + self.missing_generated
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetOverlapReport {
    pub field: SetField,
    pub mean: Score,
    pub questions: Vec<QuestionScore>,
    pub tally: SentinelTally,
    pub unmatched_generated: usize,
}

/// Scores `field` per gold question and macro-averages the non-sentinel
/// scores.
pub fn evaluate_set_field(
    field: SetField,
    gold: &RecordSet,
    generated: &RecordSet,
    config: &EvaluationConfig,
) -> SetOverlapReport {
    let mut tally = SentinelTally::default();
    let mut questions = Vec::with_capacity(gold.len());

    for gold_record in gold.iter() {
        let Some(generated_record) = generated.get(&gold_record.id) else {
            log_missing_generated(&gold_record.id, field.as_str());
            tally.missing_generated += 1;
            continue;
        };

        let outcome = score_sets(
            &normalized_set(field.values(gold_record)),
            &normalized_set(field.values(generated_record)),
        );
        if config.verbose {
            info!(
                question_id = %gold_record.id,
                field = field.as_str(),
                status = outcome.label(),
                f1 = outcome.score().f1,
                "scored question"
            );
        }
        tally.record(&outcome);
        questions.push(QuestionScore {
            id: gold_record.id.clone(),
            outcome,
        });
    }

    let mean = Score::mean(questions.iter().filter_map(|question| question.outcome.scored()));
    let unmatched_generated = count_unmatched_generated(gold, generated, field.as_str());

    debug!(
        field = field.as_str(),
        scored = tally.scored,
        no_prediction = tally.no_prediction,
        no_gold_answer = tally.no_gold_answer,
        no_gold_and_no_prediction = tally.no_gold_and_no_prediction,
        missing_generated = tally.missing_generated,
        total = tally.total(),
        "set overlap tally"
    );
    info!(
        field = field.as_str(),
        f1 = mean.f1,
        precision = mean.precision,
        recall = mean.recall,
        "set overlap evaluation complete"
    );

    SetOverlapReport {
        field,
        mean,
        questions,
        tally,
        unmatched_generated,
    }
}
