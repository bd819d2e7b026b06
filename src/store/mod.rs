//! Gold and generated question records, keyed by normalized question ID.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EvalError;
use crate::model::{
    ExactAnswer, GoldDataset, PendingQuestion, PendingQuestionList, QuestionRecord, QuestionType,
};
use crate::util::{document_id, read_json};

pub mod answers;
pub mod artifact;
#[cfg(test)]
mod tests;

pub use answers::{GeneratedAnswer, load_prediction_answers, load_ranked_answers};
pub use artifact::{StageArtifact, read_artifact};

/// Length of the IDs that lose their last characters in BioASQ-form outputs.
pub const UNTRUNCATED_ID_LEN: usize = 24;
pub const TRUNCATED_ID_LEN: usize = 20;

/// Join key for a question ID. IDs of exactly 24 characters are cut to their
/// first 20 so gold IDs line up with truncated generated IDs.
pub fn normalize_id(id: &str) -> String {
    let trimmed = id.trim();
    if trimmed.chars().count() == UNTRUNCATED_ID_LEN {
        trimmed.chars().take(TRUNCATED_ID_LEN).collect()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct LoadTally {
    pub records: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Question records in input order with a normalized-ID index.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<QuestionRecord>,
    index: HashMap<String, usize>,
    duplicates: usize,
    rejected: usize,
}

impl RecordSet {
    /// Adds a record. An identical repeat is logged and dropped; a repeat with
    /// different content is a `MalformedAnswer` error.
    pub fn insert(&mut self, record: QuestionRecord) -> Result<()> {
        let key = normalize_id(&record.id);
        if let Some(position) = self.index.get(&key) {
            let existing = &self.records[*position];
            if *existing != record {
                return Err(EvalError::MalformedAnswer {
                    id: record.id.clone(),
                    first: describe(existing),
                    second: describe(&record),
                }
                .into());
            }
            warn!(question_id = %record.id, "duplicate question record");
            self.duplicates += 1;
            return Ok(());
        }

        self.index.insert(key, self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&QuestionRecord> {
        self.index
            .get(&normalize_id(id))
            .map(|position| &self.records[*position])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut QuestionRecord> {
        match self.index.get(&normalize_id(id)) {
            Some(position) => self.records.get_mut(*position),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&normalize_id(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tally(&self) -> LoadTally {
        LoadTally {
            records: self.records.len(),
            duplicates: self.duplicates,
            rejected: self.rejected,
        }
    }

    fn reject(&mut self) {
        self.rejected += 1;
    }
}

fn describe(record: &QuestionRecord) -> String {
    match &record.exact_answer {
        Some(answer) => answer.to_json_string(),
        None => format!(
            "type={} concepts={} documents={}",
            record
                .question_type
                .map(QuestionType::as_str)
                .unwrap_or("unknown"),
            record.concepts.len(),
            record.documents.len()
        ),
    }
}

pub fn load_gold(path: &Path) -> Result<RecordSet> {
    let dataset: GoldDataset = read_json(path).context("failed to load gold dataset")?;
    let mut records = RecordSet::default();

    for question in dataset.questions {
        let question_type = match question.question_type.parse::<QuestionType>() {
            Ok(value) => value,
            Err(err) => {
                warn!(question_id = %question.id, error = %err, "skipping gold question");
                records.reject();
                continue;
            }
        };

        let exact_answer = question
            .exact_answer
            .as_ref()
            .and_then(|value| ExactAnswer::from_value(question_type, value));

        records.insert(QuestionRecord {
            id: question.id,
            question_type: Some(question_type),
            body: question.body,
            concepts: question.human_concepts.unwrap_or_default(),
            documents: question
                .documents
                .iter()
                .map(|url| document_id(url))
                .collect(),
            exact_answer,
            full_abstracts: question
                .full_abstracts
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            titles: question
                .titles
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            snippets: question
                .snippets
                .into_iter()
                .filter_map(|snippet| snippet.text)
                .collect(),
        })?;
    }

    if records.is_empty() {
        warn!(path = %path.display(), rejected = records.rejected, "gold dataset has no scorable questions");
    }
    info!(path = %path.display(), records = records.len(), "loaded gold dataset");
    Ok(records)
}

/// Where the generated side of an evaluation comes from.
#[derive(Debug, Clone, Default)]
pub struct GeneratedSources {
    /// QU or IR stage artifact.
    pub artifact: Option<PathBuf>,
    /// Single-answer `predictions.json` files, one per answer type.
    pub predictions: Vec<(QuestionType, PathBuf)>,
    /// n-best `BioASQform_BioASQ-answer.json` files.
    pub ranked: Vec<(QuestionType, PathBuf)>,
}

pub fn load_generated(sources: &GeneratedSources) -> Result<RecordSet> {
    let mut records = match &sources.artifact {
        Some(path) => records_from_artifact(&read_artifact(path)?)?,
        None => RecordSet::default(),
    };

    let predictions = load_prediction_answers(&sources.predictions)?;
    let ranked = load_ranked_answers(&sources.ranked)?;
    records.duplicates += predictions.duplicates + ranked.duplicates;
    records.rejected += predictions.rejected + ranked.rejected;

    // Ranked answers go second so their candidate lists win.
    for answer in predictions.iter().chain(ranked.iter()) {
        attach_answer(&mut records, answer)?;
    }

    debug!(
        records = records.len(),
        predictions = predictions.len(),
        ranked = ranked.len(),
        "loaded generated records"
    );
    Ok(records)
}

pub fn records_from_artifact(artifact: &StageArtifact) -> Result<RecordSet> {
    let mut records = RecordSet::default();

    for question in &artifact.questions {
        if question.id.trim().is_empty() {
            warn!("skipping artifact question without id");
            records.reject();
            continue;
        }

        let mut record = QuestionRecord {
            id: question.id.clone(),
            body: question.body.clone(),
            ..QuestionRecord::default()
        };

        if let Some(processing) = &question.processing {
            match processing.question_type.parse::<QuestionType>() {
                Ok(value) => record.question_type = Some(value),
                Err(err) => {
                    warn!(question_id = %question.id, error = %err, "generated question has no usable type");
                }
            }
            record.concepts = processing.entities.clone();
        }

        if let Some(retrieval) = &question.retrieval {
            for document in &retrieval.results {
                record.documents.push(document_id(&document.pmid));
                record.titles.push(document.title.clone());
                record.full_abstracts.push(document.abstract_text.clone());
            }
        }

        records.insert(record)?;
    }

    Ok(records)
}

/// Attaches an answer to its record, creating the record when the artifact
/// has none. An answer whose type disagrees with the artifact's tag is
/// dropped and counted as rejected.
fn attach_answer(records: &mut RecordSet, answer: &GeneratedAnswer) -> Result<()> {
    let answer_type = answer.answer.question_type();
    if let Some(record) = records.get_mut(&answer.id) {
        match record.question_type {
            Some(tagged) if tagged != answer_type => {
                warn!(
                    question_id = %answer.id,
                    tagged = %tagged,
                    answer_type = %answer_type,
                    "answer type disagrees with stage artifact; answer dropped"
                );
            }
            _ => {
                record.question_type = Some(answer_type);
                record.exact_answer = Some(answer.answer.clone());
                return Ok(());
            }
        }
        records.reject();
        return Ok(());
    }

    records.insert(QuestionRecord {
        id: answer.id.clone(),
        question_type: Some(answer.question_type),
        exact_answer: Some(answer.answer.clone()),
        ..QuestionRecord::default()
    })
}

/// Reads the question list that feeds the QU stage: a JSON document with a
/// `questions` array, or a CSV file with `ID,Question` columns.
pub fn load_question_list(path: &Path) -> Result<Vec<PendingQuestion>> {
    let is_csv = path
        .extension()
        .and_then(|value| value.to_str())
        .is_some_and(|value| value.eq_ignore_ascii_case("csv"));

    let questions = if is_csv {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut questions = Vec::new();
        for row in reader.deserialize::<PendingQuestion>() {
            questions.push(row.with_context(|| format!("failed to parse {}", path.display()))?);
        }
        questions
    } else {
        let list: PendingQuestionList = read_json(path)?;
        list.questions
    };

    if questions.is_empty() {
        bail!("no questions found in {}", path.display());
    }
    Ok(questions)
}
