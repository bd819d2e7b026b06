//! Persists a run's scores as dated, tagged CSV/JSON artifacts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EvaluationConfig;
use crate::scoring::{
    AnswerReport, FactoidReport, ListReport, SetOverlapReport, TypeReport, YesNoReport,
};
use crate::store::LoadTally;
use crate::util::{ensure_directory, report_date_stamp, report_time_stamp, sha256_file};

mod summary;
mod tables;
#[cfg(test)]
mod tests;

pub use summary::RunSummary;

/// SHA-256 of one gold or generated input file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InputDigest {
    pub role: String,
    pub path: PathBuf,
    pub sha256: String,
}

impl InputDigest {
    pub fn from_path(role: &str, path: &Path) -> Result<Self> {
        Ok(Self {
            role: role.to_string(),
            path: path.to_path_buf(),
            sha256: sha256_file(path)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub gold: LoadTally,
    pub generated: LoadTally,
    /// Gold questions whose type has no scorer (summary questions).
    pub unsupported_answer_type: usize,
    pub inputs: Vec<InputDigest>,
}

/// Everything one evaluation run produced. Families that were not evaluated
/// stay `None` and produce no artifact.
#[derive(Debug, Clone)]
pub struct ResultsBundle {
    pub config: EvaluationConfig,
    pub concepts: Option<SetOverlapReport>,
    pub documents: Option<SetOverlapReport>,
    pub question_types: Option<TypeReport>,
    pub yes_no: Option<YesNoReport>,
    pub factoid: Option<FactoidReport>,
    pub list: Option<ListReport>,
    pub diagnostics: Diagnostics,
}

impl ResultsBundle {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            config: config.clone(),
            concepts: None,
            documents: None,
            question_types: None,
            yes_no: None,
            factoid: None,
            list: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn add_answer_report(&mut self, report: AnswerReport) {
        match report {
            AnswerReport::YesNo(value) => self.yes_no = Some(value),
            AnswerReport::Factoid(value) => self.factoid = Some(value),
            AnswerReport::List(value) => self.list = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_none()
            && self.documents.is_none()
            && self.question_types.is_none()
            && self.yes_no.is_none()
            && self.factoid.is_none()
            && self.list.is_none()
    }
}

/// Directory and filename parts shared by every artifact of one save.
#[derive(Debug, Clone)]
struct ReportTarget {
    folder: PathBuf,
    time: String,
    tag: String,
}

impl ReportTarget {
    fn new(destination_dir: &Path, run_tag: &str, at: DateTime<Local>) -> Self {
        Self {
            folder: destination_dir
                .join("test_results")
                .join(report_date_stamp(at)),
            time: report_time_stamp(at),
            tag: sanitize_tag(run_tag),
        }
    }

    fn path(&self, metric: &str, extension: &str) -> PathBuf {
        self.folder
            .join(format!("{}-{}-{}.{}", metric, self.time, self.tag, extension))
    }
}

fn sanitize_tag(tag: &str) -> String {
    let cleaned: String = tag
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    }
}

/// Writes one artifact per metric family present in `bundle` plus a run
/// summary, under `{destination_dir}/test_results/{date}/`.
pub fn save(bundle: &ResultsBundle, destination_dir: &Path, run_tag: &str) -> Result<Vec<PathBuf>> {
    save_at(bundle, destination_dir, run_tag, Local::now())
}

pub fn save_at(
    bundle: &ResultsBundle,
    destination_dir: &Path,
    run_tag: &str,
    at: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let target = ReportTarget::new(destination_dir, run_tag, at);
    ensure_directory(&target.folder)?;

    if bundle.is_empty() {
        warn!(tag = %target.tag, "results bundle is empty; writing summary only");
    }

    let mut written = Vec::new();

    if let Some(report) = &bundle.concepts {
        let path = target.path("concepts", "csv");
        tables::write_set_overlap(&path, report)?;
        written.push(path);
    }
    if let Some(report) = &bundle.documents {
        let path = target.path("documents", "csv");
        tables::write_set_overlap(&path, report)?;
        written.push(path);
    }
    if let Some(report) = &bundle.question_types {
        let path = target.path("type", "json");
        crate::util::write_new_json_pretty(&path, report)
            .context("failed to write question type report")?;
        written.push(path);
    }
    if let Some(report) = &bundle.yes_no {
        let path = target.path("yesno", "csv");
        tables::write_yes_no(&path, report)?;
        written.push(path);
    }
    if let Some(report) = &bundle.factoid {
        let path = target.path("factoid", "csv");
        tables::write_factoid(&path, report)?;
        written.push(path);
    }
    if let Some(report) = &bundle.list {
        let path = target.path("list", "csv");
        tables::write_list(&path, report)?;
        written.push(path);
    }

    for path in &written {
        info!(path = %path.display(), "saved report");
    }

    let summary_path = target.path("summary", "json");
    let summary = RunSummary::from_bundle(bundle, &target.tag, &written);
    crate::util::write_new_json_pretty(&summary_path, &summary)
        .context("failed to write run summary")?;
    info!(path = %summary_path.display(), "saved run summary");
    written.push(summary_path);

    Ok(written)
}
