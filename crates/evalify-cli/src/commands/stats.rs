//! The `evalify stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use evalify_core::statistics::summarize;

use super::Context;

pub fn execute(config_path: Option<PathBuf>, exam_path: Option<PathBuf>, json: bool) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let layout = ctx.exam()?.layout;
    let summary = summarize(&ctx.results().list_all(), &layout);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Evaluations: {}", summary.evaluation_count);
    if summary.evaluation_count == 0 {
        return Ok(());
    }
    println!(
        "Average score: {:.1}/{}",
        summary.average_score, layout.question_count
    );

    let mut subjects = Table::new();
    subjects.set_header(vec!["Subject", "Questions", "Average", "Performance"]);
    for s in &summary.subjects {
        subjects.add_row(vec![
            Cell::new(&s.subject),
            Cell::new(s.total_questions),
            Cell::new(format!("{:.1}", s.average_score)),
            Cell::new(format!("{:.1}%", s.performance_pct)),
        ]);
    }
    println!("\n{subjects}");

    let mut distribution = Table::new();
    distribution.set_header(vec!["Score range", "Sheets"]);
    for bucket in &summary.distribution {
        distribution.add_row(vec![Cell::new(&bucket.label), Cell::new(bucket.count)]);
    }
    println!("\n{distribution}");

    let mut trend = Table::new();
    trend.set_header(vec!["Date", "Score"]);
    for point in &summary.trend {
        trend.add_row(vec![
            Cell::new(point.evaluation_date.format("%Y-%m-%d %H:%M")),
            Cell::new(format!("{}/{}", point.total_score, layout.question_count)),
        ]);
    }
    println!("\n{trend}");

    Ok(())
}
