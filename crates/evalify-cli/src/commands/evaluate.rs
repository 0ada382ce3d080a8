//! The `evalify evaluate` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use comfy_table::{Cell, Table};

use evalify_core::engine::EvaluateRequest;
use evalify_core::model::{EvaluationResult, ExamLayout, SheetImage};

use super::{Context, UnreadBadge};

pub async fn execute(
    config_path: Option<PathBuf>,
    exam_path: Option<PathBuf>,
    image: PathBuf,
    key: String,
    name: Option<String>,
    recognizer: Option<String>,
) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let exam = ctx.exam()?;

    let image = SheetImage::from_path(&image)
        .with_context(|| format!("failed to read image: {}", image.display()))?;

    let request = EvaluateRequest {
        image,
        answer_key: key,
        evaluation_name: name,
    };

    // Input errors are reported before any recognizer is set up.
    let engine = ctx.engine(exam);
    engine.check_request(&request)?;
    let engine = engine.with_recognizer(ctx.recognizer(recognizer.as_deref())?);
    let badge = Arc::new(UnreadBadge::default());
    engine.notifications().subscribe(badge.clone());

    let result = engine.evaluate(request).await?;

    print_result(&result, engine.layout());
    badge.report(engine.notifications());
    Ok(())
}

fn print_result(result: &EvaluationResult, layout: &ExamLayout) {
    println!(
        "Evaluated {} against '{}'",
        result.image_file_name, result.answer_key_name
    );

    let mut table = Table::new();
    table.set_header(vec!["Subject", "Score"]);
    for subject in &layout.subjects {
        if let Some(entry) = result.subject_scores.get(&subject.name) {
            table.add_row(vec![
                Cell::new(&subject.name),
                Cell::new(format!("{}/{}", entry.score, entry.total)),
            ]);
        }
    }
    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(format!("{}/{}", result.total_score, layout.question_count)),
    ]);

    println!("{table}");
    println!("Result id: {}", result.id);
}
