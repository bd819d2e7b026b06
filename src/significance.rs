//! Per-question 0/1 match files consumed by external significance tests.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::model::{ExactAnswer, QuestionType};
use crate::pipeline::GenerationLayout;
use crate::scoring::matching::normalize_answer;
use crate::store::RecordSet;
use crate::util::ensure_parent_directory;

/// Answer types pooled into one significance file. List questions never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceSet {
    FactoidAndYesNo,
    Factoid,
    YesNo,
}

impl SignificanceSet {
    pub const ALL: [SignificanceSet; 3] = [Self::FactoidAndYesNo, Self::Factoid, Self::YesNo];

    pub fn question_types(self) -> &'static [QuestionType] {
        match self {
            Self::FactoidAndYesNo => &[QuestionType::Factoid, QuestionType::YesNo],
            Self::Factoid => &[QuestionType::Factoid],
            Self::YesNo => &[QuestionType::YesNo],
        }
    }

    pub fn file_suffix(self) -> Option<&'static str> {
        match self {
            Self::FactoidAndYesNo => None,
            Self::Factoid => Some("factoid"),
            Self::YesNo => Some("yesno"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignificanceFile {
    pub set: SignificanceSet,
    pub path: PathBuf,
    pub questions: usize,
    pub correct: usize,
}

/// One flag per gold question of the given types, in gold order: whether
/// the generated canonical answer equals the gold canonical answer. Questions
/// without a generated answer count as misses.
pub fn match_flags(gold: &RecordSet, generated: &RecordSet, types: &[QuestionType]) -> Vec<bool> {
    gold.iter()
        .filter(|record| record.question_type.is_some_and(|kind| types.contains(&kind)))
        .map(|record| {
            let gold_answer = canonical(record.exact_answer.as_ref());
            let generated_answer = generated
                .get(&record.id)
                .and_then(|candidate| canonical(candidate.exact_answer.as_ref()));
            match (gold_answer, generated_answer) {
                (Some(gold_answer), Some(generated_answer)) => gold_answer == generated_answer,
                _ => false,
            }
        })
        .collect()
}

fn canonical(answer: Option<&ExactAnswer>) -> Option<String> {
    answer
        .and_then(ExactAnswer::canonical)
        .map(|value| normalize_answer(&value))
        .filter(|value| !value.is_empty())
}

/// Writes `0 1 <flag>` per question for every significance set, next to the
/// system's IR output.
pub fn write_significance_files(
    gold: &RecordSet,
    generated: &RecordSet,
    layout: &GenerationLayout,
) -> Result<Vec<SignificanceFile>> {
    let mut written = Vec::new();

    for set in SignificanceSet::ALL {
        let flags = match_flags(gold, generated, set.question_types());
        let path = layout.significance_file(set.file_suffix());
        ensure_parent_directory(&path)?;

        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        for flag in &flags {
            writeln!(out, "0 1 {}", u8::from(*flag))
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        out.flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;

        let correct = flags.iter().filter(|flag| **flag).count();
        info!(
            set = ?set,
            path = %path.display(),
            correct,
            questions = flags.len(),
            "wrote significance file"
        );
        written.push(SignificanceFile {
            set,
            path,
            questions: flags.len(),
            correct,
        });
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionRecord;

    fn record(id: &str, question_type: QuestionType, answer: ExactAnswer) -> QuestionRecord {
        QuestionRecord {
            id: id.to_string(),
            question_type: Some(question_type),
            exact_answer: Some(answer),
            ..QuestionRecord::default()
        }
    }

    fn fixture() -> (RecordSet, RecordSet) {
        let mut gold = RecordSet::default();
        for entry in [
            record("f1", QuestionType::Factoid, ExactAnswer::Factoid(vec!["Aspirin".into()])),
            record("y1", QuestionType::YesNo, ExactAnswer::YesNo("yes".into())),
            record("l1", QuestionType::List, ExactAnswer::List(vec![vec!["a".into()]])),
            record("f2", QuestionType::Factoid, ExactAnswer::Factoid(vec!["x".into()])),
        ] {
            gold.insert(entry).expect("unique");
        }

        let mut generated = RecordSet::default();
        for entry in [
            record(
                "f1",
                QuestionType::Factoid,
                ExactAnswer::Factoid(vec!["aspirin ".into(), "other".into()]),
            ),
            record("y1", QuestionType::YesNo, ExactAnswer::YesNo("no".into())),
            record("l1", QuestionType::List, ExactAnswer::List(vec![vec!["a".into()]])),
        ] {
            generated.insert(entry).expect("unique");
        }
        (gold, generated)
    }

    #[test]
    fn flags_follow_gold_order_and_exclude_lists() {
        let (gold, generated) = fixture();
        assert_eq!(
            match_flags(&gold, &generated, SignificanceSet::FactoidAndYesNo.question_types()),
            vec![true, false, false]
        );
        assert_eq!(
            match_flags(&gold, &generated, SignificanceSet::YesNo.question_types()),
            vec![false]
        );
    }

    #[test]
    fn files_hold_one_line_per_question() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let layout = GenerationLayout::new(dir.path(), "bioasq_qa.xml");
        let (gold, generated) = fixture();

        let written =
            write_significance_files(&gold, &generated, &layout).expect("files should be written");
        assert_eq!(written.len(), 3);
        assert_eq!(written[1].correct, 1);

        let raw = std::fs::read_to_string(layout.significance_file(Some("factoid")))
            .expect("factoid file should exist");
        assert_eq!(raw, "0 1 1\n0 1 0\n");
    }
}
