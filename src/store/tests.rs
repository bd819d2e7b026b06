use std::fs;

use serde_json::json;

use super::artifact::{parse_artifact, render_artifact};
use super::*;
use crate::store::artifact::{ArtifactQuestion, QuestionProcessing, Retrieval, RetrievedDocument};

const LONG_ID: &str = "51406e6223fec90375000009";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("fixture parent should be created");
    }
    fs::write(&path, contents).expect("fixture should be written");
    path
}

#[test]
fn normalize_id_truncates_only_24_character_ids() {
    assert_eq!(normalize_id(LONG_ID), "51406e6223fec9037500");
    assert_eq!(normalize_id("51406e6223fec9037500"), "51406e6223fec9037500");
    assert_eq!(normalize_id("short"), "short");
    assert_eq!(
        normalize_id("51406e6223fec903750000091"),
        "51406e6223fec903750000091"
    );
}

#[test]
fn record_lookup_joins_truncated_and_full_ids() {
    let mut records = RecordSet::default();
    records
        .insert(QuestionRecord {
            id: LONG_ID.to_string(),
            ..QuestionRecord::default()
        })
        .expect("insert should succeed");

    assert!(records.contains("51406e6223fec9037500"));
    assert_eq!(
        records.get("51406e6223fec9037500").map(|record| record.id.as_str()),
        Some(LONG_ID)
    );
}

#[test]
fn identical_duplicate_records_are_counted_not_merged() {
    let record = QuestionRecord {
        id: "q1".to_string(),
        question_type: Some(QuestionType::YesNo),
        exact_answer: Some(ExactAnswer::YesNo("yes".to_string())),
        ..QuestionRecord::default()
    };
    let mut records = RecordSet::default();
    records.insert(record.clone()).expect("first insert");
    records.insert(record).expect("identical duplicate is tolerated");

    assert_eq!(records.len(), 1);
    assert_eq!(records.tally().duplicates, 1);
}

#[test]
fn conflicting_duplicate_records_are_malformed() {
    let mut records = RecordSet::default();
    records
        .insert(QuestionRecord {
            id: "q1".to_string(),
            exact_answer: Some(ExactAnswer::YesNo("yes".to_string())),
            ..QuestionRecord::default()
        })
        .expect("first insert");

    let error = records
        .insert(QuestionRecord {
            id: "q1".to_string(),
            exact_answer: Some(ExactAnswer::YesNo("no".to_string())),
            ..QuestionRecord::default()
        })
        .expect_err("conflicting duplicate should fail");
    assert!(matches!(
        error.downcast_ref::<EvalError>(),
        Some(EvalError::MalformedAnswer { .. })
    ));
}

#[test]
fn load_gold_derives_document_ids_and_answer_shapes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let gold = json!({
        "questions": [
            {
                "id": LONG_ID,
                "type": "factoid",
                "body": "Which drug?",
                "documents": ["http://www.ncbi.nlm.nih.gov/pubmed/23959273"],
                "human_concepts": ["aspirin"],
                "exact_answer": [["aspirin", "acetylsalicylic acid"]],
                "snippets": [{"text": "Aspirin is..."}, {}],
                "full_abstracts": ["abstract one", null],
                "titles": ["title one"]
            },
            {
                "id": "q-unknown",
                "type": "essay",
                "body": "Unscorable"
            }
        ]
    });
    let path = write(dir.path(), "gold.json", &gold.to_string());

    let records = load_gold(&path).expect("gold should load");
    assert_eq!(records.len(), 1);
    assert_eq!(records.tally().rejected, 1);

    let record = records.get(LONG_ID).expect("record present");
    assert_eq!(record.documents, vec!["23959273"]);
    assert_eq!(record.concepts, vec!["aspirin"]);
    assert_eq!(record.snippets, vec!["Aspirin is..."]);
    assert_eq!(record.full_abstracts, vec!["abstract one", ""]);
    assert_eq!(
        record.exact_answer,
        Some(ExactAnswer::Factoid(vec!["aspirin".to_string()]))
    );
}

#[test]
fn load_gold_fails_on_unparseable_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(dir.path(), "gold.json", "{ not json");
    assert!(load_gold(&path).is_err());
}

#[test]
fn artifact_round_trips_processing_and_retrieval() {
    let artifact = StageArtifact {
        questions: vec![ArtifactQuestion {
            id: "q1".to_string(),
            body: "Does metformin interfere with thyroxine absorption?".to_string(),
            processing: Some(QuestionProcessing::from_entities(
                "yesno",
                vec!["metformin".to_string(), "thyroxine".to_string()],
            )),
            retrieval: Some(Retrieval {
                query_used: Some("metformin thyroxine".to_string()),
                results: vec![RetrievedDocument {
                    pmid: "123".to_string(),
                    journal: Some("Thyroid".to_string()),
                    year: Some("2011".to_string()),
                    title: "Metformin & thyroid".to_string(),
                    abstract_text: "We found <no> interaction.".to_string(),
                    mesh: vec!["Metformin".to_string()],
                }],
            }),
        }],
    };

    let rendered = render_artifact(&artifact).expect("render");
    let parsed = parse_artifact(&rendered).expect("parse");
    assert_eq!(parsed, artifact);
}

#[test]
fn parse_artifact_reads_hand_written_qu_output() {
    let raw = r#"<?xml version="1.0"?>
<Input>
  <Q id="51406e6223fec90375000009">Does metformin interfere thyroxine absorption?
    <QP>
      <Type>yesno</Type>
      <Entities>metformin</Entities>
      <Entities>thyroxine absorption</Entities>
      <Query>metformin thyroxine absorption</Query>
    </QP>
    <IR/>
  </Q>
</Input>"#;

    let artifact = parse_artifact(raw).expect("parse");
    let question = &artifact.questions[0];
    assert_eq!(question.id, LONG_ID);
    assert_eq!(question.body, "Does metformin interfere thyroxine absorption?");
    let processing = question.processing.as_ref().expect("QP present");
    assert_eq!(processing.question_type, "yesno");
    assert_eq!(processing.entities, vec!["metformin", "thyroxine absorption"]);
    assert_eq!(question.retrieval, Some(Retrieval::default()));
}

#[test]
fn load_generated_merges_artifact_predictions_and_ranked_answers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let xml = r#"<Input>
  <Q id="q-yes"><QP><Type>yesno</Type><Entities>a</Entities><Query>a</Query></QP>
    <IR><Result PMID="http://www.ncbi.nlm.nih.gov/pubmed/42"><Title>t</Title><Abstract>x</Abstract></Result></IR>
  </Q>
  <Q id="q-fact"><QP><Type>factoid</Type><Query/></QP><IR/></Q>
</Input>"#;
    let artifact = write(dir.path(), "ir/output/bioasq_qa.xml", xml);
    let yesno = write(
        dir.path(),
        "qa/yesno/predictions.json",
        &json!({"q-yes": ["yes", 0.91]}).to_string(),
    );
    let factoid = write(
        dir.path(),
        "qa/factoid/predictions.json",
        &json!({"q-fact": "aspirin"}).to_string(),
    );
    let ranked = write(
        dir.path(),
        "qa/factoid/BioASQform_BioASQ-answer.json",
        &json!({"questions": [{"id": "q-fact", "exact_answer": [["ibuprofen"], ["aspirin"]]}]})
            .to_string(),
    );

    let records = load_generated(&GeneratedSources {
        artifact: Some(artifact),
        predictions: vec![(QuestionType::YesNo, yesno), (QuestionType::Factoid, factoid)],
        ranked: vec![(QuestionType::Factoid, ranked)],
    })
    .expect("generated records should load");

    let yes = records.get("q-yes").expect("yes record");
    assert_eq!(yes.documents, vec!["42"]);
    assert_eq!(yes.exact_answer, Some(ExactAnswer::YesNo("yes".to_string())));

    let fact = records.get("q-fact").expect("factoid record");
    assert_eq!(
        fact.exact_answer,
        Some(ExactAnswer::Factoid(vec![
            "ibuprofen".to_string(),
            "aspirin".to_string()
        ]))
    );
}

#[test]
fn conflicting_predictions_across_files_are_malformed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = write(
        dir.path(),
        "a/predictions.json",
        &json!({"q1": "yes"}).to_string(),
    );
    let second = write(
        dir.path(),
        "b/predictions.json",
        &json!({"q1": "no"}).to_string(),
    );

    let error = load_generated(&GeneratedSources {
        artifact: None,
        predictions: vec![(QuestionType::YesNo, first), (QuestionType::YesNo, second)],
        ranked: Vec::new(),
    })
    .expect_err("conflicting answers should fail");
    assert!(matches!(
        error.downcast_ref::<EvalError>(),
        Some(EvalError::MalformedAnswer { .. })
    ));
}

#[test]
fn prediction_candidate_lists_are_kept_whole() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(
        dir.path(),
        "predictions.json",
        &json!({"q1": ["BRCA1", "BRCA2"], "q2": ["TP53", 0.4]}).to_string(),
    );

    let answers =
        load_prediction_answers(&[(QuestionType::List, path)]).expect("predictions should load");
    let collected: Vec<Vec<String>> = answers.iter().map(|entry| entry.answer.candidates()).collect();
    assert_eq!(collected, vec![vec!["BRCA1", "BRCA2"], vec!["TP53"]]);
}

#[test]
fn question_list_loads_from_csv() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(
        dir.path(),
        "questions.csv",
        "ID,Question\nq1,Is aspirin an NSAID?\nq2,Which gene causes cystic fibrosis?\n",
    );

    let questions = load_question_list(&path).expect("csv should load");
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[1].body, "Which gene causes cystic fibrosis?");
}

#[test]
fn answers_of_another_type_do_not_replace_artifact_tags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let xml = r#"<Input>
  <Q id="q1"><QP><Type>factoid</Type><Query/></QP><IR/></Q>
  <Q id="q2"><QP><Type>oops</Type><Query/></QP><IR/></Q>
</Input>"#;
    let artifact = write(dir.path(), "ir/output/bioasq_qa.xml", xml);
    let yesno = write(
        dir.path(),
        "qa/yesno/predictions.json",
        &json!({"q1": "yes", "q2": "no"}).to_string(),
    );

    let records = load_generated(&GeneratedSources {
        artifact: Some(artifact),
        predictions: vec![(QuestionType::YesNo, yesno)],
        ranked: Vec::new(),
    })
    .expect("generated records should load");

    let tagged = records.get("q1").expect("q1 record");
    assert_eq!(tagged.question_type, Some(QuestionType::Factoid));
    assert_eq!(tagged.exact_answer, None);

    let untyped = records.get("q2").expect("q2 record");
    assert_eq!(untyped.question_type, Some(QuestionType::YesNo));
    assert_eq!(untyped.exact_answer, Some(ExactAnswer::YesNo("no".to_string())));

    assert_eq!(records.tally().rejected, 1);
}
