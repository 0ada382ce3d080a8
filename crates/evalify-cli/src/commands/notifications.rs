//! The `evalify notifications` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::Context;

pub fn list(config_path: Option<PathBuf>, limit: usize) -> Result<()> {
    let ctx = Context::load(config_path, None)?;
    let log = ctx.notifications();
    let events = log.list_recent(limit);

    if events.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Time", "Kind", "Message"]);
    for event in &events {
        table.add_row(vec![
            Cell::new(if event.read { "" } else { "*" }),
            Cell::new(event.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(event.kind),
            Cell::new(&event.message),
        ]);
    }

    println!("{table}");
    println!("{} unread", log.unread_count());
    Ok(())
}

pub fn read_all(config_path: Option<PathBuf>) -> Result<()> {
    let ctx = Context::load(config_path, None)?;
    let log = ctx.notifications();
    let unread = log.unread_count();
    log.mark_all_read()?;
    println!("Marked {unread} notification(s) as read.");
    Ok(())
}
