//! Matching engine and per-answer-type metric calculators.

use tracing::{debug, warn};

use crate::config::EvaluationConfig;
use crate::error::{EvalError, RecordSide};
use crate::model::QuestionType;
use crate::store::RecordSet;

pub mod factoid;
pub mod list;
pub mod matching;
pub mod question_type;
pub mod set_overlap;
pub mod yesno;
#[cfg(test)]
mod tests;

pub use factoid::{FactoidReport, evaluate_factoid};
pub use list::{ListReport, evaluate_list};
pub use matching::{MatchCounts, Score};
pub use question_type::{TypeReport, evaluate_question_types};
pub use set_overlap::{SetField, SetOverlapReport, SentinelTally, evaluate_set_field};
pub use yesno::{YesNoReport, evaluate_yes_no};

/// Type-specific answer scores. Summary questions have no variant.
#[derive(Debug, Clone)]
pub enum AnswerReport {
    YesNo(YesNoReport),
    Factoid(FactoidReport),
    List(ListReport),
}

pub fn score_answers(
    question_type: QuestionType,
    gold: &RecordSet,
    generated: &RecordSet,
    config: &EvaluationConfig,
) -> Result<AnswerReport, EvalError> {
    match question_type {
        QuestionType::YesNo => Ok(AnswerReport::YesNo(evaluate_yes_no(gold, generated, config))),
        QuestionType::Factoid => Ok(AnswerReport::Factoid(evaluate_factoid(
            gold, generated, config,
        ))),
        QuestionType::List => Ok(AnswerReport::List(evaluate_list(gold, generated, config))),
        QuestionType::Summary => Err(EvalError::UnsupportedAnswerType(question_type)),
    }
}

fn log_missing_generated(id: &str, family: &str) {
    let err = EvalError::MissingRecord {
        id: id.to_string(),
        side: RecordSide::Generated,
    };
    debug!(family, error = %err, "excluded from score");
}

/// Counts generated records that have no gold counterpart, logging each.
pub fn count_unmatched_generated(gold: &RecordSet, generated: &RecordSet, family: &str) -> usize {
    let mut unmatched = 0_usize;
    for record in generated.iter().filter(|record| !gold.contains(&record.id)) {
        let err = EvalError::MissingRecord {
            id: record.id.clone(),
            side: RecordSide::Gold,
        };
        debug!(family, error = %err, "generated record ignored");
        unmatched += 1;
    }
    if unmatched > 0 {
        warn!(family, unmatched, "generated records without gold counterpart");
    }
    unmatched
}
