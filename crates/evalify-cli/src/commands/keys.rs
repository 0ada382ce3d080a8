//! The `evalify keys` commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use comfy_table::{Cell, Table};

use evalify_core::model::{AnswerKey, SheetImage};

use super::{Context, UnreadBadge};

pub fn list(config_path: Option<PathBuf>, exam_path: Option<PathBuf>) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let engine = ctx.engine(ctx.exam()?);
    let registry = engine.registry();

    let keys = registry.list_all();
    if keys.is_empty() {
        println!("No answer keys defined.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Source", "Answered"]);
    for (name, key) in &keys {
        let source = if registry.is_builtin(name) {
            "built-in"
        } else {
            "custom"
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(source),
            Cell::new(format!("{}/{}", key.len(), registry.question_count())),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub async fn create(
    config_path: Option<PathBuf>,
    exam_path: Option<PathBuf>,
    name: String,
    answers: Option<String>,
    master: Option<PathBuf>,
    recognizer: Option<String>,
) -> Result<()> {
    let ctx = Context::load(config_path, exam_path)?;
    let mut engine = ctx.engine(ctx.exam()?);
    let badge = Arc::new(UnreadBadge::default());
    engine.notifications().subscribe(badge.clone());

    let key = match (answers, master) {
        (Some(answers), _) => {
            let key = AnswerKey::from_compact(&answers)
                .map_err(|e| anyhow::anyhow!("invalid answers: {e}"))?;
            engine.create_key_manual(&name, key.clone())?;
            key
        }
        (None, Some(master)) => {
            let image = SheetImage::from_path(&master)
                .with_context(|| format!("failed to read image: {}", master.display()))?;
            engine = engine.with_recognizer(ctx.recognizer(recognizer.as_deref())?);
            engine.create_key_from_master(&name, &image).await?
        }
        (None, None) => anyhow::bail!("either --answers or --master is required"),
    };

    println!(
        "Created answer key '{name}' ({} of {} questions answered)",
        key.len(),
        engine.layout().question_count
    );
    badge.report(engine.notifications());
    Ok(())
}
