//! The `evalify results` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use evalify_report::csv::{write_csv, DATE_FORMAT};
use evalify_report::html::write_html_report;

use super::Context;
use crate::ExportFormat;

pub fn list(
    config_path: Option<PathBuf>,
    exam_path: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let layout = ctx.exam()?.layout;
    let mut results = ctx.results().list_all();

    if results.is_empty() {
        println!("No evaluation results yet.");
        return Ok(());
    }
    let total = results.len();
    if let Some(limit) = limit {
        results.truncate(limit);
    }

    let mut header = vec![
        "Date".to_string(),
        "Name".to_string(),
        "File".to_string(),
        "Answer Key".to_string(),
    ];
    header.extend(layout.subjects.iter().map(|s| s.name.clone()));
    header.push("Total".to_string());

    let mut table = Table::new();
    table.set_header(header);
    for r in &results {
        let mut row = vec![
            Cell::new(r.evaluation_date.format(DATE_FORMAT)),
            Cell::new(r.evaluation_name.as_deref().unwrap_or("")),
            Cell::new(&r.image_file_name),
            Cell::new(&r.answer_key_name),
        ];
        for subject in &layout.subjects {
            row.push(Cell::new(
                r.subject_scores
                    .get(&subject.name)
                    .map(|s| format!("{}/{}", s.score, s.total))
                    .unwrap_or_else(|| "N/A".to_string()),
            ));
        }
        row.push(Cell::new(format!(
            "{}/{}",
            r.total_score, layout.question_count
        )));
        table.add_row(row);
    }

    println!("{table}");
    if results.len() < total {
        println!("Showing {} of {total} results.", results.len());
    }
    Ok(())
}

pub fn export(
    config_path: Option<PathBuf>,
    exam_path: Option<PathBuf>,
    format: ExportFormat,
    output: PathBuf,
) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let layout = ctx.exam()?.layout;
    let results = ctx.results().list_all();

    if results.is_empty() {
        println!("No results to export.");
        return Ok(());
    }

    match format {
        ExportFormat::Csv => write_csv(&results, &layout, &output)?,
        ExportFormat::Html => write_html_report(&results, &layout, &output)?,
    }

    tracing::info!("exported {} results to {}", results.len(), output.display());
    println!("Exported {} results to {}", results.len(), output.display());
    Ok(())
}
