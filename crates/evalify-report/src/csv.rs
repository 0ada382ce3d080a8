//! CSV export of evaluation results.
//!
//! One row per result, in stored order. Every data field is double-quoted;
//! header fields are quoted only when they need to be.

use anyhow::{Context, Result};
use std::path::Path;

use evalify_core::model::{EvaluationResult, ExamLayout};

/// Date format used in the `Evaluation Date` column (UTC).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn header_field(name: &str) -> String {
    if name.contains([',', '"', '\n', '\r']) {
        quote(name)
    } else {
        name.to_string()
    }
}

/// Render `results` as CSV with one subject column per layout subject.
pub fn to_csv(results: &[EvaluationResult], layout: &ExamLayout) -> String {
    let mut headers = vec![
        "Evaluation Date".to_string(),
        "Evaluation Name".to_string(),
        "File Name".to_string(),
        "Answer Key".to_string(),
    ];
    headers.extend(layout.subjects.iter().map(|s| header_field(&s.name)));
    headers.push("Total Score".to_string());

    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(headers.join(","));

    for result in results {
        let mut row = vec![
            quote(&result.evaluation_date.format(DATE_FORMAT).to_string()),
            quote(result.evaluation_name.as_deref().unwrap_or("")),
            quote(&result.image_file_name),
            quote(&result.answer_key_name),
        ];
        for subject in &layout.subjects {
            row.push(match result.subject_scores.get(&subject.name) {
                Some(entry) => quote(&format!("{}/{}", entry.score, entry.total)),
                None => quote("N/A"),
            });
        }
        row.push(quote(&format!(
            "{}/{}",
            result.total_score, layout.question_count
        )));
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Write the CSV export to a file.
pub fn write_csv(results: &[EvaluationResult], layout: &ExamLayout, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, to_csv(results, layout))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
