use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use super::log_missing_generated;
use crate::config::EvaluationConfig;
use crate::model::QuestionType;
use crate::store::RecordSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1: f64,
    pub support: usize,
}

/// Per-label classification metrics laid out like a scikit-learn
/// `classification_report(..., output_dict=True)`.
#[derive(Debug, Clone, Serialize)]
pub struct TypeReport {
    #[serde(flatten)]
    pub labels: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassMetrics,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassMetrics,
    #[serde(skip)]
    pub tally: TypeTally,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeTally {
    pub compared: usize,
    pub missing_generated: usize,
    pub untyped_generated: usize,
}

/// Compares gold and predicted question types for every question present on
/// both sides.
pub fn evaluate_question_types(
    gold: &RecordSet,
    generated: &RecordSet,
    config: &EvaluationConfig,
) -> TypeReport {
    let mut tally = TypeTally::default();
    let mut pairs = Vec::<(QuestionType, QuestionType)>::new();

    for gold_record in gold.iter() {
        let Some(gold_type) = gold_record.question_type else {
            continue;
        };
        let Some(generated_record) = generated.get(&gold_record.id) else {
            log_missing_generated(&gold_record.id, "type");
            tally.missing_generated += 1;
            continue;
        };
        let Some(generated_type) = generated_record.question_type else {
            tally.untyped_generated += 1;
            continue;
        };
        if config.verbose {
            info!(
                question_id = %gold_record.id,
                gold = %gold_type,
                generated = %generated_type,
                correct = gold_type == generated_type,
                "compared question type"
            );
        }
        pairs.push((gold_type, generated_type));
    }
    tally.compared = pairs.len();

    let report = classification_report(&pairs, tally);
    info!(
        accuracy = report.accuracy,
        macro_f1 = report.macro_avg.f1,
        compared = tally.compared,
        "question type evaluation complete"
    );
    report
}

pub fn classification_report(
    pairs: &[(QuestionType, QuestionType)],
    tally: TypeTally,
) -> TypeReport {
    let mut labels = BTreeMap::<String, ClassMetrics>::new();
    let mut label_set: Vec<QuestionType> = pairs
        .iter()
        .flat_map(|(gold, predicted)| [*gold, *predicted])
        .collect();
    label_set.sort();
    label_set.dedup();

    for label in &label_set {
        let true_positives = pairs
            .iter()
            .filter(|(gold, predicted)| gold == label && predicted == label)
            .count();
        let predicted_count = pairs.iter().filter(|(_, predicted)| predicted == label).count();
        let support = pairs.iter().filter(|(gold, _)| gold == label).count();

        let precision = ratio(true_positives, predicted_count);
        let recall = ratio(true_positives, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        labels.insert(
            label.as_str().to_string(),
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            },
        );
    }

    let total = pairs.len();
    let correct = pairs.iter().filter(|(gold, predicted)| gold == predicted).count();
    let label_count = labels.len().max(1) as f64;

    let mut macro_avg = ClassMetrics {
        support: total,
        ..ClassMetrics::default()
    };
    let mut weighted_avg = macro_avg;
    for metrics in labels.values() {
        macro_avg.precision += metrics.precision / label_count;
        macro_avg.recall += metrics.recall / label_count;
        macro_avg.f1 += metrics.f1 / label_count;

        if total > 0 {
            let weight = metrics.support as f64 / total as f64;
            weighted_avg.precision += metrics.precision * weight;
            weighted_avg.recall += metrics.recall * weight;
            weighted_avg.f1 += metrics.f1 * weight;
        }
    }

    TypeReport {
        labels,
        accuracy: ratio(correct, total),
        macro_avg,
        weighted_avg,
        tally,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
