use super::factoid::reciprocal_rank;
use super::matching::{ScoreOutcome, match_sets, normalized_set, score_sets};
use super::question_type::{TypeTally, classification_report};
use super::*;
use crate::model::{ExactAnswer, QuestionRecord};

const EPSILON: f64 = 1e-9;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

fn records(entries: Vec<QuestionRecord>) -> RecordSet {
    let mut set = RecordSet::default();
    for entry in entries {
        set.insert(entry).expect("fixture records should be unique");
    }
    set
}

fn with_concepts(id: &str, concepts: &[&str]) -> QuestionRecord {
    QuestionRecord {
        id: id.to_string(),
        question_type: Some(QuestionType::Factoid),
        concepts: concepts.iter().map(|value| value.to_string()).collect(),
        ..QuestionRecord::default()
    }
}

fn yes_no(id: &str, answer: &str) -> QuestionRecord {
    QuestionRecord {
        id: id.to_string(),
        question_type: Some(QuestionType::YesNo),
        exact_answer: Some(ExactAnswer::YesNo(answer.to_string())),
        ..QuestionRecord::default()
    }
}

fn factoid(id: &str, candidates: &[&str]) -> QuestionRecord {
    QuestionRecord {
        id: id.to_string(),
        question_type: Some(QuestionType::Factoid),
        exact_answer: Some(ExactAnswer::Factoid(
            candidates.iter().map(|value| value.to_string()).collect(),
        )),
        ..QuestionRecord::default()
    }
}

fn list(id: &str, groups: &[&[&str]]) -> QuestionRecord {
    QuestionRecord {
        id: id.to_string(),
        question_type: Some(QuestionType::List),
        exact_answer: Some(ExactAnswer::List(
            groups
                .iter()
                .map(|group| group.iter().map(|value| value.to_string()).collect())
                .collect(),
        )),
        ..QuestionRecord::default()
    }
}

#[test]
fn overlapping_concepts_score_two_thirds() {
    let gold = normalized_set(["a", "b", "c"]);
    let generated = normalized_set(["b", "c", "d"]);

    let counts = match_sets(&gold, &generated);
    assert_eq!(counts.true_positives, 2);
    assert_eq!(counts.false_positives, 1);
    assert_eq!(counts.false_negatives, 1);

    let score = score_sets(&gold, &generated)
        .scored()
        .expect("non-empty sets should be scored");
    assert_close(score.precision, 2.0 / 3.0);
    assert_close(score.recall, 2.0 / 3.0);
    assert_close(score.f1, 2.0 / 3.0);
}

#[test]
fn matching_normalizes_case_and_whitespace() {
    let gold = normalized_set(["Aspirin", " BRCA1 "]);
    let generated = normalized_set(["aspirin", "brca1", ""]);
    assert_eq!(score_sets(&gold, &generated), ScoreOutcome::Scored(Score {
        f1: 1.0,
        precision: 1.0,
        recall: 1.0,
    }));
}

#[test]
fn degenerate_sets_resolve_to_sentinels_in_priority_order() {
    let empty = normalized_set(Vec::<String>::new());
    let some = normalized_set(["x"]);

    assert_eq!(score_sets(&empty, &empty), ScoreOutcome::NoGoldAndNoPrediction);
    assert_eq!(score_sets(&some, &empty), ScoreOutcome::NoPrediction);
    assert_eq!(score_sets(&empty, &some), ScoreOutcome::NoGoldAnswer);
    assert_eq!(ScoreOutcome::NoPrediction.score(), Score::NO_PREDICTION);
}

#[test]
fn disjoint_sets_score_zero_without_dividing_by_zero() {
    let outcome = score_sets(&normalized_set(["a"]), &normalized_set(["b"]));
    let score = outcome.scored().expect("scored");
    assert_eq!(score, Score::default());
}

#[test]
fn scored_f1_stays_within_unit_interval() {
    let cases: [(&[&str], &[&str]); 4] = [
        (&["a"], &["a", "b", "c", "d"]),
        (&["a", "b", "c", "d"], &["a"]),
        (&["a", "b"], &["c"]),
        (&["a", "b"], &["b", "a"]),
    ];
    for (gold, generated) in cases {
        let score = score_sets(&normalized_set(gold), &normalized_set(generated)).score();
        assert!((0.0..=1.0).contains(&score.f1), "f1 out of range: {}", score.f1);
    }
}

#[test]
fn concept_mean_excludes_sentinels_and_tally_covers_corpus() {
    let config = EvaluationConfig::default();
    let gold = records(vec![
        with_concepts("q1", &["a", "b", "c"]),
        with_concepts("q2", &["x"]),
        with_concepts("q3", &[]),
        with_concepts("q4", &["y"]),
        with_concepts("q5", &["z"]),
    ]);
    let generated = records(vec![
        with_concepts("q1", &["b", "c", "d"]),
        with_concepts("q2", &["x"]),
        with_concepts("q3", &[]),
        with_concepts("q4", &[]),
        with_concepts("extra", &["e"]),
    ]);

    let report = evaluate_set_field(SetField::Concepts, &gold, &generated, &config);

    assert_close(report.mean.f1, (2.0 / 3.0 + 1.0) / 2.0);
    assert_eq!(report.tally.scored, 2);
    assert_eq!(report.tally.no_gold_and_no_prediction, 1);
    assert_eq!(report.tally.no_prediction, 1);
    assert_eq!(report.tally.missing_generated, 1);
    assert_eq!(report.tally.total(), gold.len());
    assert_eq!(report.unmatched_generated, 1);
    assert_eq!(report.questions.len(), 4);
}

#[test]
fn single_yes_question_leaves_no_side_at_zero() {
    let config = EvaluationConfig::default();
    let gold = records(vec![yes_no("q1", "yes")]);
    let generated = records(vec![yes_no("q1", "yes")]);

    let report = evaluate_yes_no(&gold, &generated, &config);
    assert_eq!(report.yes_counts.true_positives, 1);
    assert_eq!(report.no_counts, MatchCounts::default());
    assert_close(report.yes.f1, 1.0);
    assert_close(report.no.f1, 0.0);
    assert_close(report.overall.f1, 0.5);
}

#[test]
fn yes_no_overall_is_unweighted_average_of_both_sides() {
    let config = EvaluationConfig::default();
    let gold = records(vec![
        yes_no("q1", "yes"),
        yes_no("q2", "no"),
        yes_no("q3", "yes"),
        yes_no("q4", "no"),
    ]);
    let generated = records(vec![
        yes_no("q1", "yes"),
        yes_no("q2", "no"),
        yes_no("q3", "no"),
        yes_no("q4", "No "),
    ]);

    let report = evaluate_yes_no(&gold, &generated, &config);

    // yes side: tp=1 fn=1 fp=0; no side: tp=2 fp=1 fn=0
    assert_close(report.yes.precision, 1.0);
    assert_close(report.yes.recall, 0.5);
    assert_close(report.no.precision, 2.0 / 3.0);
    assert_close(report.no.recall, 1.0);
    assert_close(report.overall.f1, (report.yes.f1 + report.no.f1) / 2.0);
    assert_eq!(report.tally.evaluated, 4);
}

#[test]
fn yes_no_with_one_of_each_all_correct_scores_one() {
    let config = EvaluationConfig::default();
    let gold = records(vec![yes_no("q1", "yes"), yes_no("q2", "no")]);
    let generated = records(vec![yes_no("q1", "yes"), yes_no("q2", "no")]);

    let report = evaluate_yes_no(&gold, &generated, &config);
    assert_close(report.overall.f1, 1.0);
    assert!(report.questions.iter().all(|question| question.correct));
}

#[test]
fn yes_no_treats_other_generated_types_as_no_prediction() {
    let config = EvaluationConfig::default();
    let gold = records(vec![yes_no("q1", "yes"), factoid("q2", &["aspirin"])]);
    let generated = records(vec![factoid("q1", &["yes"]), yes_no("q3", "maybe")]);

    let report = evaluate_yes_no(&gold, &generated, &config);
    assert_eq!(report.tally.gold_questions, 1);
    assert_eq!(report.tally.no_prediction, 1);
    assert_eq!(report.tally.evaluated, 0);
    assert_close(report.overall.f1, 0.0);
}

#[test]
fn factoid_reciprocal_rank_divides_by_list_length() {
    let candidates: Vec<String> = ["ibuprofen", "aspirin", "paracetamol"]
        .iter()
        .map(|value| value.to_string())
        .collect();
    assert_close(reciprocal_rank("aspirin", &candidates), 1.0 / 6.0);
    assert_close(reciprocal_rank("codeine", &candidates), 0.0);
}

#[test]
fn factoid_second_place_hit_is_lenient_only() {
    let config = EvaluationConfig::default();
    let gold = records(vec![factoid("q1", &["Aspirin"])]);
    let generated = records(vec![factoid("q1", &["ibuprofen", " aspirin", "paracetamol"])]);

    let report = evaluate_factoid(&gold, &generated, &config);
    assert_close(report.strict_accuracy, 0.0);
    assert_close(report.lenient_accuracy, 1.0);
    assert_close(report.mrr, 1.0 / 6.0);
}

#[test]
fn factoid_strict_never_exceeds_lenient() {
    let config = EvaluationConfig::default();
    let gold = records(vec![
        factoid("q1", &["a"]),
        factoid("q2", &["b"]),
        factoid("q3", &["c"]),
        factoid("q4", &[]),
    ]);
    let generated = records(vec![
        factoid("q1", &["a", "x"]),
        factoid("q2", &["x", "b"]),
        factoid("q3", &[]),
        factoid("q4", &["d"]),
    ]);

    let report = evaluate_factoid(&gold, &generated, &config);
    assert!(report.strict_accuracy <= report.lenient_accuracy);
    assert_eq!(report.tally.evaluated, 3);
    assert_eq!(report.tally.no_gold_answer, 1);
    assert_eq!(report.tally.empty_candidates, 1);
    assert_close(report.strict_accuracy, 1.0 / 3.0);
    assert_close(report.lenient_accuracy, 2.0 / 3.0);
    assert_close(report.mrr, (0.5 + 0.25 + 0.0) / 3.0);
}

#[test]
fn list_scores_use_one_running_accumulator() {
    let config = EvaluationConfig::default();
    let gold = records(vec![
        list("q1", &[&["BRCA1", "breast cancer 1"], &["TP53"]]),
        list("q2", &[&["EGFR"]]),
        list("q3", &[]),
    ]);
    let generated = records(vec![
        list("q1", &[&["brca1"], &["kras"]]),
        list("q2", &[&["egfr"]]),
        list("q3", &[&["x"]]),
    ]);

    let report = evaluate_list(&gold, &generated, &config);

    // q1: tp=1 fp=1 fn=2; after q2: tp=2 fp=1 fn=2
    assert_eq!(report.counts.true_positives, 2);
    assert_eq!(report.counts.false_positives, 1);
    assert_eq!(report.counts.false_negatives, 2);
    assert_eq!(report.questions.len(), 2);

    let first = report.questions[0].running;
    assert_close(first.precision, 0.5);
    assert_close(first.recall, 1.0 / 3.0);

    let second = report.questions[1].running;
    assert_close(second.precision, 2.0 / 3.0);
    assert_close(second.recall, 0.5);
    assert_eq!(report.cumulative, second);
    assert_close(report.mean.precision, (0.5 + 2.0 / 3.0) / 2.0);
    assert_eq!(report.tally.no_gold_answer, 1);
}

#[test]
fn list_running_score_differs_from_per_question_average() {
    let config = EvaluationConfig::default();
    let gold = records(vec![list("q1", &[&["a"]]), list("q2", &[&["b"], &["c"], &["d"]])]);
    let generated = records(vec![list("q1", &[&["a"]]), list("q2", &[&["x"]])]);

    let report = evaluate_list(&gold, &generated, &config);
    let per_question = Score::mean(
        report
            .questions
            .iter()
            .map(|question| question.own.score()),
    );
    assert!((report.mean.recall - per_question.recall).abs() > EPSILON);
}

#[test]
fn summary_answers_are_rejected() {
    let config = EvaluationConfig::default();
    let empty = RecordSet::default();
    let result = score_answers(QuestionType::Summary, &empty, &empty, &config);
    assert!(matches!(
        result,
        Err(EvalError::UnsupportedAnswerType(QuestionType::Summary))
    ));
}

#[test]
fn classification_report_matches_hand_computed_values() {
    let pairs = vec![
        (QuestionType::YesNo, QuestionType::YesNo),
        (QuestionType::YesNo, QuestionType::Factoid),
        (QuestionType::Factoid, QuestionType::Factoid),
        (QuestionType::List, QuestionType::List),
    ];
    let report = classification_report(&pairs, TypeTally::default());

    let factoid = report.labels["factoid"];
    assert_close(factoid.precision, 0.5);
    assert_close(factoid.recall, 1.0);
    assert_eq!(factoid.support, 1);

    let yesno = report.labels["yesno"];
    assert_close(yesno.precision, 1.0);
    assert_close(yesno.recall, 0.5);

    assert_close(report.accuracy, 0.75);
    assert_eq!(report.macro_avg.support, 4);

    let json = serde_json::to_value(&report).expect("report should serialize");
    assert!(json.get("macro avg").is_some());
    assert!(json["factoid"].get("f1-score").is_some());
}

#[test]
fn question_types_join_by_id_and_count_gaps() {
    let config = EvaluationConfig {
        verbose: true,
        ..EvaluationConfig::default()
    };
    let gold = records(vec![
        yes_no("q1", "yes"),
        factoid("q2", &["aspirin"]),
        list("q3", &[&["a"]]),
    ]);
    let generated = records(vec![
        factoid("q2", &["aspirin"]),
        yes_no("q1", "no"),
        QuestionRecord {
            id: "q3".to_string(),
            ..QuestionRecord::default()
        },
    ]);

    let report = evaluate_question_types(&gold, &generated, &config);

    assert_close(report.accuracy, 1.0);
    assert_eq!(report.tally.compared, 2);
    assert_eq!(report.tally.untyped_generated, 1);
    assert_eq!(report.tally.missing_generated, 0);
}
