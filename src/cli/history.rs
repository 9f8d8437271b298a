use anyhow::Result;
use chrono::Local;

use crate::{
    storage::{entities::ActivityEntry, log_store::LogStore},
    utils::time::format_hhmm,
};

#[derive(Debug, clap::Args)]
pub struct LogCommand {
    #[arg(short = 'n', long, default_value_t = 20, help = "Number of entries to show")]
    count: usize,
    #[arg(long, help = "Print entries as JSON, one per line")]
    json: bool,
}

/// Prints the newest entries of the log, newest first.
pub fn process_log_command(LogCommand { count, json }: LogCommand, store: &impl LogStore) -> Result<()> {
    let entries = store.recent(count)?;
    let lines = if json {
        entries
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        table(&entries)
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn table(entries: &[ActivityEntry]) -> Vec<String> {
    let width = entries
        .iter()
        .map(|v| v.name.chars().count())
        .max()
        .unwrap_or_default()
        .max("name".len());

    let mut lines = vec![format!(
        "{:>6}  {:<width$}  {:<16}  {:<5}  current",
        "id", "name", "started", "time"
    )];
    lines.extend(entries.iter().map(|entry| {
        format!(
            "{:>6}  {:<width$}  {:<16}  {:<5}  {}",
            entry.id,
            entry.name,
            entry
                .started
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            format_hhmm(entry.duration),
            if entry.current { "*" } else { "" }
        )
        .trim_end()
        .to_string()
    }));
    lines
}
