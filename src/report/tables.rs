use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::scoring::{FactoidReport, ListReport, Score, SetOverlapReport, YesNoReport};
use crate::util::create_new_file;

const SCORE_HEADER: [&str; 3] = ["f1", "precision", "recall"];

fn open_table(path: &Path) -> Result<Writer<File>> {
    let file = create_new_file(path)?;
    Ok(csv::WriterBuilder::new().flexible(true).from_writer(file))
}

fn finish(mut writer: Writer<File>, path: &Path) -> Result<()> {
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

fn score_cells(score: &Score) -> Vec<String> {
    vec![
        score.f1.to_string(),
        score.precision.to_string(),
        score.recall.to_string(),
    ]
}

fn write_row<I, T>(writer: &mut Writer<File>, path: &Path, row: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer
        .write_record(row)
        .with_context(|| format!("failed to write row to {}", path.display()))
}

/// Aggregate row first, then one row per gold question that had a generated
/// counterpart. Sentinel rows carry their fixed triple and status label.
pub fn write_set_overlap(path: &Path, report: &SetOverlapReport) -> Result<()> {
    let mut writer = open_table(path)?;

    write_row(&mut writer, path, ["mean_f1", "mean_precision", "mean_recall"])?;
    write_row(&mut writer, path, score_cells(&report.mean))?;

    write_row(&mut writer, path, ["id", "status", "f1", "precision", "recall"])?;
    for question in &report.questions {
        let mut row = vec![question.id.clone(), question.outcome.label().to_string()];
        row.extend(score_cells(&question.outcome.score()));
        write_row(&mut writer, path, row)?;
    }

    finish(writer, path)
}

pub fn write_yes_no(path: &Path, report: &YesNoReport) -> Result<()> {
    let mut writer = open_table(path)?;

    write_row(&mut writer, path, ["class", "f1", "precision", "recall"])?;
    for (label, score) in [
        ("overall", &report.overall),
        ("yes", &report.yes),
        ("no", &report.no),
    ] {
        let mut row = vec![label.to_string()];
        row.extend(score_cells(score));
        write_row(&mut writer, path, row)?;
    }

    write_row(&mut writer, path, ["id", "gold", "generated", "correct"])?;
    for question in &report.questions {
        write_row(
            &mut writer,
            path,
            [
                question.id.clone(),
                question.gold.clone(),
                question.generated.clone(),
                u8::from(question.correct).to_string(),
            ],
        )?;
    }

    finish(writer, path)
}

pub fn write_factoid(path: &Path, report: &FactoidReport) -> Result<()> {
    let mut writer = open_table(path)?;

    write_row(&mut writer, path, ["mrr", "strict_accuracy", "lenient_accuracy"])?;
    write_row(
        &mut writer,
        path,
        [
            report.mrr.to_string(),
            report.strict_accuracy.to_string(),
            report.lenient_accuracy.to_string(),
        ],
    )?;

    write_row(
        &mut writer,
        path,
        ["id", "reciprocal_rank", "strict", "lenient", "candidates"],
    )?;
    for question in &report.questions {
        write_row(
            &mut writer,
            path,
            [
                question.id.clone(),
                question.reciprocal_rank.to_string(),
                u8::from(question.strict).to_string(),
                u8::from(question.lenient).to_string(),
                question.candidates.to_string(),
            ],
        )?;
    }

    finish(writer, path)
}

/// The aggregate row carries the mean of running scores followed by the
/// final accumulator's score. Per-question rows hold the running score after
/// that question plus its own overlap counts.
pub fn write_list(path: &Path, report: &ListReport) -> Result<()> {
    let mut writer = open_table(path)?;

    write_row(
        &mut writer,
        path,
        [
            "mean_f1",
            "mean_precision",
            "mean_recall",
            "cumulative_f1",
            "cumulative_precision",
            "cumulative_recall",
        ],
    )?;
    let mut aggregate = score_cells(&report.mean);
    aggregate.extend(score_cells(&report.cumulative));
    write_row(&mut writer, path, aggregate)?;

    let mut header = vec!["id"];
    header.extend(SCORE_HEADER);
    header.extend(["true_positives", "false_positives", "false_negatives"]);
    write_row(&mut writer, path, header)?;
    for question in &report.questions {
        let mut row = vec![question.id.clone()];
        row.extend(score_cells(&question.running));
        row.extend([
            question.counts.true_positives.to_string(),
            question.counts.false_positives.to_string(),
            question.counts.false_negatives.to_string(),
        ]);
        write_row(&mut writer, path, row)?;
    }

    finish(writer, path)
}
