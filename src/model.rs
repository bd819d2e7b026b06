use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Factoid,
    List,
    #[serde(rename = "yesno")]
    YesNo,
    Summary,
}

impl QuestionType {
    /// Types the QA stage produces answers for, in answer-file order.
    pub const ANSWERABLE: [QuestionType; 3] = [Self::Factoid, Self::List, Self::YesNo];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Factoid => "factoid",
            Self::List => "list",
            Self::YesNo => "yesno",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = EvalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "factoid" => Ok(Self::Factoid),
            "list" => Ok(Self::List),
            "yesno" | "yes/no" => Ok(Self::YesNo),
            "summary" => Ok(Self::Summary),
            _ => Err(EvalError::UnknownQuestionType(value.to_string())),
        }
    }
}

/// Exact answer, shaped by the question type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExactAnswer {
    YesNo(String),
    /// Ranked candidates, best first.
    Factoid(Vec<String>),
    /// Synonym groups, one group per expected answer.
    List(Vec<Vec<String>>),
}

impl ExactAnswer {
    /// Interprets a raw JSON answer for the given type. Summary answers and
    /// shapes with no usable text yield `None`.
    pub fn from_value(question_type: QuestionType, value: &Value) -> Option<Self> {
        match question_type {
            QuestionType::YesNo => first_text(value).map(Self::YesNo),
            QuestionType::Factoid => match value {
                Value::Array(items) => Some(Self::Factoid(
                    items.iter().filter_map(first_text).collect(),
                )),
                other => first_text(other).map(|text| Self::Factoid(vec![text])),
            },
            QuestionType::List => match value {
                Value::Array(items) => Some(Self::List(
                    items
                        .iter()
                        .map(synonym_group)
                        .filter(|group| !group.is_empty())
                        .collect(),
                )),
                other => first_text(other).map(|text| Self::List(vec![vec![text]])),
            },
            QuestionType::Summary => None,
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::YesNo(_) => QuestionType::YesNo,
            Self::Factoid(_) => QuestionType::Factoid,
            Self::List(_) => QuestionType::List,
        }
    }

    /// One string per answer position: the first synonym of each list group.
    pub fn candidates(&self) -> Vec<String> {
        match self {
            Self::YesNo(text) => vec![text.clone()],
            Self::Factoid(values) => values.clone(),
            Self::List(groups) => groups
                .iter()
                .filter_map(|group| group.first().cloned())
                .collect(),
        }
    }

    /// Every string the answer carries, synonyms included.
    pub fn flattened(&self) -> Vec<String> {
        match self {
            Self::List(groups) => groups.iter().flatten().cloned().collect(),
            other => other.candidates(),
        }
    }

    pub fn canonical(&self) -> Option<String> {
        self.candidates().into_iter().next()
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(if *flag { "yes" } else { "no" }.to_string()),
        Value::Array(items) => items.first().and_then(first_text),
        Value::Null | Value::Object(_) => None,
    }
}

fn synonym_group(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(first_text).collect(),
        other => first_text(other).into_iter().collect(),
    }
}

/// One question as seen by a single side of an evaluation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionRecord {
    /// Identifier as it appeared in the source file.
    pub id: String,
    pub question_type: Option<QuestionType>,
    pub body: String,
    pub concepts: Vec<String>,
    pub documents: Vec<String>,
    pub exact_answer: Option<ExactAnswer>,
    pub full_abstracts: Vec<String>,
    pub titles: Vec<String>,
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldDataset {
    pub questions: Vec<GoldQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub human_concepts: Option<Vec<String>>,
    #[serde(default)]
    pub exact_answer: Option<Value>,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    #[serde(default)]
    pub full_abstracts: Vec<Option<String>>,
    #[serde(default)]
    pub titles: Vec<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub text: Option<String>,
}

/// A question waiting to enter the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "Question")]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingQuestionList {
    pub questions: Vec<PendingQuestion>,
}

/// SQuAD-shaped input consumed by the external answer extractors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaInput {
    pub data: Vec<QaData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaData {
    pub paragraphs: Vec<QaParagraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaParagraph {
    pub context: String,
    pub qas: Vec<QaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaItem {
    pub id: String,
    pub question: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn question_type_parses_case_insensitively() {
        assert_eq!("YesNo".parse::<QuestionType>().ok(), Some(QuestionType::YesNo));
        assert_eq!(" list ".parse::<QuestionType>().ok(), Some(QuestionType::List));
        assert!("essay".parse::<QuestionType>().is_err());
    }

    #[test]
    fn factoid_answer_takes_first_synonym_of_each_group() {
        let value = json!([["aspirin", "acetylsalicylic acid"], ["ibuprofen"]]);
        let answer = ExactAnswer::from_value(QuestionType::Factoid, &value)
            .expect("factoid answer should parse");
        assert_eq!(
            answer,
            ExactAnswer::Factoid(vec!["aspirin".to_string(), "ibuprofen".to_string()])
        );
        assert_eq!(answer.canonical().as_deref(), Some("aspirin"));
    }

    #[test]
    fn list_answer_flattens_synonyms_but_keeps_one_candidate_per_group() {
        let value = json!([["BRCA1", "breast cancer 1"], "TP53", []]);
        let answer =
            ExactAnswer::from_value(QuestionType::List, &value).expect("list answer should parse");
        assert_eq!(answer.candidates(), vec!["BRCA1", "TP53"]);
        assert_eq!(answer.flattened(), vec!["BRCA1", "breast cancer 1", "TP53"]);
    }

    #[test]
    fn yesno_answer_uses_first_element_of_prediction_pair() {
        let value = json!(["no", 0.87]);
        let answer =
            ExactAnswer::from_value(QuestionType::YesNo, &value).expect("yesno should parse");
        assert_eq!(answer, ExactAnswer::YesNo("no".to_string()));
    }

    #[test]
    fn summary_answers_are_not_interpreted() {
        let value = json!("A long ideal answer.");
        assert!(ExactAnswer::from_value(QuestionType::Summary, &value).is_none());
    }
}
