use serde::Serialize;
use tracing::{info, warn};

use super::log_missing_generated;
use super::matching::{MatchCounts, Score, normalize_answer};
use crate::config::EvaluationConfig;
use crate::model::{ExactAnswer, QuestionType};
use crate::store::RecordSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Yes,
    No,
}

impl Polarity {
    fn parse(value: &str) -> Option<Self> {
        match normalize_answer(value).as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct YesNoOutcome {
    pub id: String,
    pub gold: String,
    pub generated: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YesNoTally {
    pub gold_questions: usize,
    pub evaluated: usize,
    pub missing_generated: usize,
    pub no_prediction: usize,
    pub unrecognized_generated: usize,
    pub invalid_gold: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct YesNoReport {
    pub overall: Score,
    pub yes: Score,
    pub no: Score,
    pub yes_counts: MatchCounts,
    pub no_counts: MatchCounts,
    pub questions: Vec<YesNoOutcome>,
    pub tally: YesNoTally,
}

/// Binary F1 computed once for the "yes" class and once for the "no" class,
/// then averaged without weighting.
pub fn evaluate_yes_no(
    gold: &RecordSet,
    generated: &RecordSet,
    config: &EvaluationConfig,
) -> YesNoReport {
    let mut yes_counts = MatchCounts::default();
    let mut no_counts = MatchCounts::default();
    let mut tally = YesNoTally::default();
    let mut questions = Vec::new();

    for gold_record in gold
        .iter()
        .filter(|record| record.question_type == Some(QuestionType::YesNo))
    {
        tally.gold_questions += 1;

        let gold_answer = gold_record
            .exact_answer
            .as_ref()
            .and_then(ExactAnswer::canonical)
            .unwrap_or_default();
        let Some(gold_polarity) = Polarity::parse(&gold_answer) else {
            warn!(question_id = %gold_record.id, answer = %gold_answer, "gold yes/no answer is neither yes nor no");
            tally.invalid_gold += 1;
            continue;
        };

        let Some(generated_record) = generated.get(&gold_record.id) else {
            log_missing_generated(&gold_record.id, "yesno");
            tally.missing_generated += 1;
            continue;
        };

        let generated_answer = match (&generated_record.question_type, &generated_record.exact_answer) {
            (Some(QuestionType::YesNo), Some(ExactAnswer::YesNo(answer))) => answer.clone(),
            _ => {
                tally.no_prediction += 1;
                continue;
            }
        };

        let Some(generated_polarity) = Polarity::parse(&generated_answer) else {
            if config.verbose {
                info!(
                    question_id = %gold_record.id,
                    answer = %generated_answer,
                    "generated yes/no answer ignored"
                );
            }
            tally.unrecognized_generated += 1;
            continue;
        };

        match (gold_polarity, generated_polarity) {
            (Polarity::Yes, Polarity::Yes) => yes_counts.true_positives += 1,
            (Polarity::No, Polarity::No) => no_counts.true_positives += 1,
            (Polarity::Yes, Polarity::No) => {
                yes_counts.false_negatives += 1;
                no_counts.false_positives += 1;
            }
            (Polarity::No, Polarity::Yes) => {
                yes_counts.false_positives += 1;
                no_counts.false_negatives += 1;
            }
        }

        tally.evaluated += 1;
        questions.push(YesNoOutcome {
            id: gold_record.id.clone(),
            gold: normalize_answer(&gold_answer),
            generated: normalize_answer(&generated_answer),
            correct: gold_polarity == generated_polarity,
        });
    }

    let yes = yes_counts.score();
    let no = no_counts.score();
    let overall = Score {
        f1: (yes.f1 + no.f1) / 2.0,
        precision: (yes.precision + no.precision) / 2.0,
        recall: (yes.recall + no.recall) / 2.0,
    };

    info!(
        f1 = overall.f1,
        precision = overall.precision,
        recall = overall.recall,
        yes_f1 = yes.f1,
        no_f1 = no.f1,
        evaluated = tally.evaluated,
        "yes/no evaluation complete"
    );

    YesNoReport {
        overall,
        yes,
        no,
        yes_counts,
        no_counts,
        questions,
        tally,
    }
}
