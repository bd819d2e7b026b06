use std::fs;

use chrono::TimeZone;

use super::*;
use crate::model::{ExactAnswer, QuestionRecord, QuestionType};
use crate::scoring::{SetField, evaluate_factoid, evaluate_set_field};
use crate::store::RecordSet;

fn fixed_time() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 3, 7, 14, 5, 9)
        .single()
        .expect("fixed local time should be unambiguous")
}

fn concept_records(entries: &[(&str, &[&str])]) -> RecordSet {
    let mut set = RecordSet::default();
    for (id, concepts) in entries {
        set.insert(QuestionRecord {
            id: id.to_string(),
            question_type: Some(QuestionType::List),
            concepts: concepts.iter().map(|value| value.to_string()).collect(),
            ..QuestionRecord::default()
        })
        .expect("fixture ids should be unique");
    }
    set
}

fn factoid_records(entries: &[(&str, &[&str])]) -> RecordSet {
    let mut set = RecordSet::default();
    for (id, candidates) in entries {
        set.insert(QuestionRecord {
            id: id.to_string(),
            question_type: Some(QuestionType::Factoid),
            exact_answer: Some(ExactAnswer::Factoid(
                candidates.iter().map(|value| value.to_string()).collect(),
            )),
            ..QuestionRecord::default()
        })
        .expect("fixture ids should be unique");
    }
    set
}

fn sample_bundle() -> ResultsBundle {
    let config = EvaluationConfig::default();
    let mut bundle = ResultsBundle::new(&config);

    let gold = concept_records(&[("q1", &["a", "b", "c"]), ("q2", &["x"])]);
    let generated = concept_records(&[("q1", &["b", "c", "d"]), ("q2", &[])]);
    bundle.concepts = Some(evaluate_set_field(
        SetField::Concepts,
        &gold,
        &generated,
        &config,
    ));

    let gold = factoid_records(&[("f1", &["aspirin"])]);
    let generated = factoid_records(&[("f1", &["ibuprofen", "aspirin", "paracetamol"])]);
    bundle.factoid = Some(evaluate_factoid(&gold, &generated, &config));
    bundle
}

#[test]
fn save_writes_dated_tagged_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let written = save_at(&sample_bundle(), dir.path(), "gold qu", fixed_time())
        .expect("save should succeed");

    let folder = dir.path().join("test_results").join("Mar-07-2026");
    assert_eq!(
        written,
        vec![
            folder.join("concepts-140509-gold_qu.csv"),
            folder.join("factoid-140509-gold_qu.csv"),
            folder.join("summary-140509-gold_qu.json"),
        ]
    );
    for path in &written {
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn default_results_dir_nests_one_test_results_level() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let destination = dir.path().join(EvaluationConfig::default().results_dir);
    let written =
        save_at(&sample_bundle(), &destination, "run", fixed_time()).expect("save should succeed");

    let relative = written[0]
        .strip_prefix(dir.path())
        .expect("report should land under the destination");
    let levels = relative
        .components()
        .filter(|part| part.as_os_str() == "test_results")
        .count();
    assert_eq!(levels, 1, "unexpected layout {}", relative.display());
    assert!(written[0].parent().is_some_and(|parent| parent.ends_with("test_results/Mar-07-2026")));
}

#[test]
fn set_overlap_table_puts_aggregate_first_and_keeps_sentinels() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let written = save_at(&sample_bundle(), dir.path(), "t", fixed_time()).expect("save");

    let raw = fs::read_to_string(&written[0]).expect("concepts report should be readable");
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines[0], "mean_f1,mean_precision,mean_recall");
    assert!(lines[1].starts_with("0.66666"));
    assert_eq!(lines[2], "id,status,f1,precision,recall");
    assert!(lines[3].starts_with("q1,scored,0.66666"));
    assert_eq!(lines[4], "q2,no_prediction,-1,-1,-1");
}

#[test]
fn factoid_table_lists_reciprocal_ranks() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let written = save_at(&sample_bundle(), dir.path(), "t", fixed_time()).expect("save");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&written[1])
        .expect("factoid report should open");
    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("rows should parse");

    assert_eq!(&rows[0][0], "mrr");
    let mrr: f64 = rows[1][0].parse().expect("mrr should be numeric");
    assert!((mrr - 1.0 / 6.0).abs() < 1e-9);
    assert_eq!(&rows[3][0], "f1");
    assert_eq!(&rows[3][2], "0");
    assert_eq!(&rows[3][3], "1");
}

#[test]
fn summary_records_tallies_and_report_paths() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let written = save_at(&sample_bundle(), dir.path(), "t", fixed_time()).expect("save");

    let raw = fs::read(written.last().expect("summary path")).expect("summary readable");
    let summary: serde_json::Value = serde_json::from_slice(&raw).expect("summary is json");

    assert_eq!(summary["run_tag"], "t");
    assert_eq!(summary["scores"]["concepts"]["tally"]["no_prediction"], 1);
    assert_eq!(summary["scores"]["factoid"]["tally"]["evaluated"], 1);
    assert!(summary["scores"].get("list").is_none());
    assert_eq!(summary["reports"].as_array().map(Vec::len), Some(2));
    assert_eq!(summary["config"]["xml_name"], "bioasq_qa.xml");
}

#[test]
fn saving_twice_in_the_same_second_refuses_to_overwrite() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let bundle = sample_bundle();
    save_at(&bundle, dir.path(), "t", fixed_time()).expect("first save");
    assert!(save_at(&bundle, dir.path(), "t", fixed_time()).is_err());
    save_at(&bundle, dir.path(), "other", fixed_time()).expect("different tag does not collide");
}

#[test]
fn empty_bundle_still_writes_summary() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let bundle = ResultsBundle::new(&EvaluationConfig::default());
    assert!(bundle.is_empty());

    let written = save_at(&bundle, dir.path(), "", fixed_time()).expect("save");
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with("summary-140509-run.json"));
}
