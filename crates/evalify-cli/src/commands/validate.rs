//! The `evalify validate` command.

use std::path::PathBuf;

use anyhow::Result;

use evalify_core::parser::validate_exam;

use super::Context;

pub fn execute(config_path: Option<PathBuf>, exam_path: Option<PathBuf>) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let exam = ctx.exam()?;

    println!(
        "Exam: {} ({} questions, {} subjects, {} built-in keys)",
        exam.name,
        exam.layout.question_count,
        exam.layout.subjects.len(),
        exam.builtin_keys.len()
    );

    let warnings = validate_exam(&exam);
    for w in &warnings {
        let prefix = w
            .scope
            .as_ref()
            .map(|scope| format!("  [{scope}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Exam definition valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
