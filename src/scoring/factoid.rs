use serde::Serialize;
use tracing::info;

use super::log_missing_generated;
use super::matching::normalize_answer;
use crate::config::EvaluationConfig;
use crate::model::{ExactAnswer, QuestionType};
use crate::store::RecordSet;

#[derive(Debug, Clone, Serialize)]
pub struct FactoidOutcome {
    pub id: String,
    pub reciprocal_rank: f64,
    pub strict: bool,
    pub lenient: bool,
    pub candidates: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FactoidTally {
    pub gold_questions: usize,
    pub evaluated: usize,
    pub no_gold_answer: usize,
    pub missing_generated: usize,
    pub no_prediction: usize,
    pub empty_candidates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactoidReport {
    pub mrr: f64,
    pub strict_accuracy: f64,
    pub lenient_accuracy: f64,
    pub questions: Vec<FactoidOutcome>,
    pub tally: FactoidTally,
}

/// Contribution of one question to MRR: `1 / (n * r)` for the first
/// candidate equal to `gold` at 1-indexed rank `r` in a list of `n`
/// candidates, 0 when absent.
// TODO: confirm whether the extra 1/n factor is intended before comparing
// against standard MRR figures.
pub fn reciprocal_rank(gold: &str, candidates: &[String]) -> f64 {
    let n = candidates.len();
    candidates
        .iter()
        .position(|candidate| candidate == gold)
        .map(|index| 1.0 / (n as f64 * (index + 1) as f64))
        .unwrap_or(0.0)
}

pub fn evaluate_factoid(
    gold: &RecordSet,
    generated: &RecordSet,
    config: &EvaluationConfig,
) -> FactoidReport {
    let mut tally = FactoidTally::default();
    let mut questions = Vec::new();

    for gold_record in gold
        .iter()
        .filter(|record| record.question_type == Some(QuestionType::Factoid))
    {
        tally.gold_questions += 1;

        let Some(gold_answer) = gold_record
            .exact_answer
            .as_ref()
            .and_then(ExactAnswer::canonical)
            .map(|value| normalize_answer(&value))
            .filter(|value| !value.is_empty())
        else {
            tally.no_gold_answer += 1;
            continue;
        };

        let Some(generated_record) = generated.get(&gold_record.id) else {
            log_missing_generated(&gold_record.id, "factoid");
            tally.missing_generated += 1;
            continue;
        };

        let Some(ExactAnswer::Factoid(raw_candidates)) = &generated_record.exact_answer else {
            tally.no_prediction += 1;
            continue;
        };

        let candidates: Vec<String> = raw_candidates
            .iter()
            .map(|candidate| normalize_answer(candidate))
            .collect();
        if candidates.is_empty() {
            tally.empty_candidates += 1;
        }

        let strict = candidates.first() == Some(&gold_answer);
        let lenient = candidates.contains(&gold_answer);
        let reciprocal_rank = reciprocal_rank(&gold_answer, &candidates);

        if config.verbose {
            info!(
                question_id = %gold_record.id,
                gold = %gold_answer,
                top = %candidates.first().map(String::as_str).unwrap_or(""),
                reciprocal_rank,
                "scored factoid question"
            );
        }

        tally.evaluated += 1;
        questions.push(FactoidOutcome {
            id: gold_record.id.clone(),
            reciprocal_rank,
            strict,
            lenient,
            candidates: candidates.len(),
        });
    }

    let evaluated = questions.len();
    let (mrr, strict_accuracy, lenient_accuracy) = if evaluated == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let n = evaluated as f64;
        let mrr = questions.iter().map(|q| q.reciprocal_rank).sum::<f64>() / n;
        let strict = questions.iter().filter(|q| q.strict).count() as f64 / n;
        let lenient = questions.iter().filter(|q| q.lenient).count() as f64 / n;
        (mrr, strict, lenient)
    };

    info!(
        mrr,
        strict_accuracy,
        lenient_accuracy,
        evaluated,
        "factoid evaluation complete"
    );

    FactoidReport {
        mrr,
        strict_accuracy,
        lenient_accuracy,
        questions,
        tally,
    }
}
