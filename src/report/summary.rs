use std::path::PathBuf;

use serde::Serialize;

use super::{Diagnostics, ResultsBundle};
use crate::config::EvaluationConfig;
use crate::scoring::factoid::FactoidTally;
use crate::scoring::question_type::TypeTally;
use crate::scoring::yesno::YesNoTally;
use crate::scoring::{MatchCounts, Score, SentinelTally};
use crate::util::now_utc_string;

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub generated_at: String,
    pub run_tag: String,
    pub config: &'a EvaluationConfig,
    pub reports: Vec<PathBuf>,
    pub scores: ScoreSummary,
    pub diagnostics: &'a Diagnostics,
}

#[derive(Debug, Default, Serialize)]
pub struct ScoreSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concepts: Option<SetOverlapSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<SetOverlapSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_types: Option<TypeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_no: Option<YesNoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factoid: Option<FactoidSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListSummary>,
}

#[derive(Debug, Serialize)]
pub struct SetOverlapSummary {
    pub mean: Score,
    pub tally: SentinelTally,
    pub unmatched_generated: usize,
}

#[derive(Debug, Serialize)]
pub struct TypeSummary {
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    pub tally: TypeTally,
}

#[derive(Debug, Serialize)]
pub struct YesNoSummary {
    pub overall: Score,
    pub yes: Score,
    pub no: Score,
    pub tally: YesNoTally,
}

#[derive(Debug, Serialize)]
pub struct FactoidSummary {
    pub mrr: f64,
    pub strict_accuracy: f64,
    pub lenient_accuracy: f64,
    pub tally: FactoidTally,
}

#[derive(Debug, Serialize)]
pub struct ListSummary {
    pub mean: Score,
    pub cumulative: Score,
    pub counts: MatchCounts,
    pub gold_questions: usize,
    pub tally: SentinelTally,
}

impl<'a> RunSummary<'a> {
    pub fn from_bundle(bundle: &'a ResultsBundle, run_tag: &str, reports: &[PathBuf]) -> Self {
        let scores = ScoreSummary {
            concepts: bundle.concepts.as_ref().map(|report| SetOverlapSummary {
                mean: report.mean,
                tally: report.tally,
                unmatched_generated: report.unmatched_generated,
            }),
            documents: bundle.documents.as_ref().map(|report| SetOverlapSummary {
                mean: report.mean,
                tally: report.tally,
                unmatched_generated: report.unmatched_generated,
            }),
            question_types: bundle.question_types.as_ref().map(|report| TypeSummary {
                accuracy: report.accuracy,
                macro_f1: report.macro_avg.f1,
                weighted_f1: report.weighted_avg.f1,
                tally: report.tally,
            }),
            yes_no: bundle.yes_no.as_ref().map(|report| YesNoSummary {
                overall: report.overall,
                yes: report.yes,
                no: report.no,
                tally: report.tally,
            }),
            factoid: bundle.factoid.as_ref().map(|report| FactoidSummary {
                mrr: report.mrr,
                strict_accuracy: report.strict_accuracy,
                lenient_accuracy: report.lenient_accuracy,
                tally: report.tally,
            }),
            list: bundle.list.as_ref().map(|report| ListSummary {
                mean: report.mean,
                cumulative: report.cumulative,
                counts: report.counts,
                gold_questions: report.gold_questions,
                tally: report.tally,
            }),
        };

        Self {
            generated_at: now_utc_string(),
            run_tag: run_tag.to_string(),
            config: &bundle.config,
            reports: reports.to_vec(),
            scores,
            diagnostics: &bundle.diagnostics,
        }
    }
}
