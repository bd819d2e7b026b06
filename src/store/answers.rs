use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::normalize_id;
use crate::error::EvalError;
use crate::model::{ExactAnswer, QuestionType};
use crate::util::read_json;

/// An answer read from a generated answer file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub id: String,
    pub question_type: QuestionType,
    pub answer: ExactAnswer,
}

/// Answers keyed by normalized question ID, kept in file order.
#[derive(Debug, Clone, Default)]
pub struct AnswerSet {
    answers: Vec<GeneratedAnswer>,
    index: HashMap<String, (usize, PathBuf)>,
    pub duplicates: usize,
    pub rejected: usize,
}

impl AnswerSet {
    fn insert(&mut self, answer: GeneratedAnswer, source: &Path) -> Result<()> {
        let key = normalize_id(&answer.id);
        if let Some((position, first_source)) = self.index.get(&key) {
            let existing = &self.answers[*position];
            if existing.answer != answer.answer {
                return Err(EvalError::MalformedAnswer {
                    id: answer.id,
                    first: format!("{} ({})", existing.answer.to_json_string(), first_source.display()),
                    second: format!("{} ({})", answer.answer.to_json_string(), source.display()),
                }
                .into());
            }
            warn!(
                question_id = %answer.id,
                path = %source.display(),
                "duplicate answer for question"
            );
            self.duplicates += 1;
            return Ok(());
        }

        self.index
            .insert(key, (self.answers.len(), source.to_path_buf()));
        self.answers.push(answer);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedAnswer> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }
}

/// Loads `predictions.json` files shaped as `{id: answer}` or
/// `{id: [answer, prediction_meta]}`. Missing files are skipped.
pub fn load_prediction_answers(sources: &[(QuestionType, PathBuf)]) -> Result<AnswerSet> {
    let mut answers = AnswerSet::default();

    for (question_type, path) in sources {
        if !path.exists() {
            warn!(path = %path.display(), question_type = %question_type, "prediction file missing");
            continue;
        }

        let raw: Map<String, Value> = read_json(path)?;
        debug!(path = %path.display(), count = raw.len(), "loaded prediction file");
        for (id, value) in raw {
            let canonical = canonical_prediction(*question_type, &value);
            match ExactAnswer::from_value(*question_type, canonical) {
                Some(answer) => answers.insert(
                    GeneratedAnswer {
                        id,
                        question_type: *question_type,
                        answer,
                    },
                    path,
                )?,
                None => {
                    warn!(question_id = %id, path = %path.display(), "unusable prediction value");
                    answers.rejected += 1;
                }
            }
        }
    }

    Ok(answers)
}

/// Picks the answer out of a prediction value. Yes/no pairs always carry the
/// answer first; other types only drop a trailing non-text element, so an
/// n-best candidate list survives intact.
fn canonical_prediction(question_type: QuestionType, value: &Value) -> &Value {
    let Value::Array(items) = value else {
        return value;
    };
    let Some(first) = items.first() else {
        return value;
    };

    if question_type == QuestionType::YesNo {
        return first;
    }

    match items.get(1) {
        Some(Value::String(_)) | Some(Value::Array(_)) | None => value,
        Some(_) => first,
    }
}

#[derive(Debug, Deserialize)]
struct RankedAnswerFile {
    #[serde(default)]
    questions: Vec<RankedAnswer>,
}

#[derive(Debug, Deserialize)]
struct RankedAnswer {
    id: String,
    #[serde(default)]
    exact_answer: Option<Value>,
}

/// Loads n-best `BioASQform_BioASQ-answer.json` files. Missing files are
/// skipped.
pub fn load_ranked_answers(sources: &[(QuestionType, PathBuf)]) -> Result<AnswerSet> {
    let mut answers = AnswerSet::default();

    for (question_type, path) in sources {
        if !path.exists() {
            warn!(path = %path.display(), question_type = %question_type, "ranked answer file missing");
            continue;
        }

        let file: RankedAnswerFile = read_json(path)?;
        debug!(path = %path.display(), count = file.questions.len(), "loaded ranked answer file");
        for entry in file.questions {
            let Some(value) = entry.exact_answer else {
                warn!(question_id = %entry.id, path = %path.display(), "ranked entry has no exact_answer");
                answers.rejected += 1;
                continue;
            };
            match ExactAnswer::from_value(*question_type, &value) {
                Some(answer) => answers.insert(
                    GeneratedAnswer {
                        id: entry.id,
                        question_type: *question_type,
                        answer,
                    },
                    path,
                )?,
                None => {
                    warn!(question_id = %entry.id, path = %path.display(), "unusable ranked answer");
                    answers.rejected += 1;
                }
            }
        }
    }

    Ok(answers)
}
