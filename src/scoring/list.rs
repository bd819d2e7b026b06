use serde::Serialize;
use tracing::info;

use super::log_missing_generated;
use super::matching::{MatchCounts, Score, ScoreOutcome, match_sets, normalized_set, score_sets};
use super::set_overlap::SentinelTally;
use crate::config::EvaluationConfig;
use crate::model::{ExactAnswer, QuestionType};
use crate::store::RecordSet;

#[derive(Debug, Clone, Serialize)]
pub struct ListOutcome {
    pub id: String,
    /// This question's own overlap, kept for diagnostics.
    pub own: ScoreOutcome,
    pub counts: MatchCounts,
    /// Score of the run-wide counters after this question was added.
    pub running: Score,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    /// Mean of the running scores, one per evaluated question.
    pub mean: Score,
    /// Score of the final run-wide counters.
    pub cumulative: Score,
    pub counts: MatchCounts,
    pub questions: Vec<ListOutcome>,
    pub gold_questions: usize,
    pub tally: SentinelTally,
}

/// List questions share one tp/fp/fn accumulator across the whole run. Each
/// evaluated question adds its overlap counts and records the accumulator's
/// score at that point.
pub fn evaluate_list(
    gold: &RecordSet,
    generated: &RecordSet,
    config: &EvaluationConfig,
) -> ListReport {
    let mut counts = MatchCounts::default();
    let mut tally = SentinelTally::default();
    let mut questions = Vec::new();
    let mut gold_questions = 0_usize;

    for gold_record in gold
        .iter()
        .filter(|record| record.question_type == Some(QuestionType::List))
    {
        gold_questions += 1;

        let gold_items = normalized_set(
            gold_record
                .exact_answer
                .as_ref()
                .map(ExactAnswer::flattened)
                .unwrap_or_default(),
        );
        if gold_items.is_empty() {
            tally.no_gold_answer += 1;
            continue;
        }

        let Some(generated_record) = generated.get(&gold_record.id) else {
            log_missing_generated(&gold_record.id, "list");
            tally.missing_generated += 1;
            continue;
        };

        let Some(answer @ ExactAnswer::List(_)) = &generated_record.exact_answer else {
            tally.no_prediction += 1;
            continue;
        };

        let generated_items = normalized_set(answer.candidates());
        let own = score_sets(&gold_items, &generated_items);
        let question_counts = match_sets(&gold_items, &generated_items);
        tally.record(&own);

        counts += question_counts;
        let running = counts.score();

        if config.verbose {
            info!(
                question_id = %gold_record.id,
                true_positives = question_counts.true_positives,
                false_positives = question_counts.false_positives,
                false_negatives = question_counts.false_negatives,
                running_f1 = running.f1,
                "scored list question"
            );
        }

        questions.push(ListOutcome {
            id: gold_record.id.clone(),
            own,
            counts: question_counts,
            running,
        });
    }

    let mean = Score::mean(questions.iter().map(|question| question.running));
    let cumulative = counts.score();

    info!(
        f1 = mean.f1,
        precision = mean.precision,
        recall = mean.recall,
        cumulative_f1 = cumulative.f1,
        evaluated = questions.len(),
        "list evaluation complete"
    );

    ListReport {
        mean,
        cumulative,
        counts,
        questions,
        gold_questions,
        tally,
    }
}
