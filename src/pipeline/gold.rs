use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::stages::require_input;
use super::{GenerationLayout, IrSubstitution, Stage};
use crate::model::QuestionRecord;
use crate::store::RecordSet;
use crate::store::artifact::{
    ArtifactQuestion, QuestionProcessing, Retrieval, RetrievedDocument, StageArtifact,
    read_artifact, write_artifact,
};

/// Writes the gold QU artifact to its place in `layout`.
pub fn write_gold_qu(layout: &GenerationLayout, gold: &RecordSet) -> Result<PathBuf> {
    let artifact = gold_qu_artifact(gold);
    let path = layout.gold_qu_output();
    write_artifact(&path, &artifact)?;
    info!(path = %path.display(), questions = artifact.questions.len(), "wrote gold QU artifact");
    Ok(path)
}

/// Writes the gold IR artifact derived from the QU-shaped artifact at `base`.
pub fn write_gold_ir(
    layout: &GenerationLayout,
    gold: &RecordSet,
    base: &Path,
    variant: IrSubstitution,
    snippet_limit: usize,
) -> Result<PathBuf> {
    require_input(Stage::InformationRetrieval, base)?;
    let artifact = gold_ir_artifact(&read_artifact(base)?, gold, variant, snippet_limit);
    let path = layout.gold_ir_output(variant);
    write_artifact(&path, &artifact)?;
    info!(
        base = %base.display(),
        path = %path.display(),
        variant = ?variant,
        "wrote gold IR artifact"
    );
    Ok(path)
}

/// QU-shaped artifact carrying the gold type and human concepts of every gold
/// question. The query is the concepts joined by a space; IR is left empty.
pub fn gold_qu_artifact(gold: &RecordSet) -> StageArtifact {
    let mut questions = Vec::with_capacity(gold.len());
    for record in gold.iter() {
        let Some(question_type) = record.question_type else {
            continue;
        };
        if record.concepts.is_empty() {
            debug!(question_id = %record.id, "gold question has no human concepts");
        }
        questions.push(ArtifactQuestion {
            id: record.id.clone(),
            body: record.body.clone(),
            processing: Some(QuestionProcessing::from_entities(
                question_type.as_str(),
                record.concepts.clone(),
            )),
            retrieval: Some(Retrieval::default()),
        });
    }
    StageArtifact { questions }
}

/// Replaces the retrieval of every question in `base` with exactly one gold
/// result: the first gold document and title, and either the first full
/// abstract or the first `snippet_limit` snippets joined by a space.
pub fn gold_ir_artifact(
    base: &StageArtifact,
    gold: &RecordSet,
    variant: IrSubstitution,
    snippet_limit: usize,
) -> StageArtifact {
    let mut artifact = base.clone();
    let mut missing = 0_usize;

    for question in &mut artifact.questions {
        let Some(record) = gold.get(&question.id) else {
            warn!(question_id = %question.id, "no gold record for question; leaving IR empty");
            missing += 1;
            question.retrieval = Some(Retrieval::default());
            continue;
        };

        question.retrieval = Some(Retrieval {
            query_used: None,
            results: vec![gold_document(record, variant, snippet_limit)],
        });
    }

    if missing > 0 {
        warn!(missing, "questions without gold retrieval");
    }
    artifact
}

fn gold_document(
    record: &QuestionRecord,
    variant: IrSubstitution,
    snippet_limit: usize,
) -> RetrievedDocument {
    let abstract_text = match variant {
        IrSubstitution::Abstracts => record.full_abstracts.first().cloned().unwrap_or_default(),
        IrSubstitution::Snippets => record
            .snippets
            .iter()
            .take(snippet_limit)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" "),
    };

    RetrievedDocument {
        pmid: record.documents.first().cloned().unwrap_or_default(),
        title: record.titles.first().cloned().unwrap_or_default(),
        abstract_text,
        ..RetrievedDocument::default()
    }
}
