use comfy_table::{Cell, Table};

use crate::cli::import::preview_table;
use crate::cli::load_history;
use crate::error::Result;
use crate::models::ImportSession;
use crate::settings::load_settings;

fn print_session(session: &ImportSession) {
    println!("Session {} ({})", session.id, session.timestamp);
    println!("  File:     {}", session.file_name);
    println!("  Source:   {}", session.source);
    println!("  Status:   {}", session.status.as_str());
    println!(
        "  Rows:     {} parsed, {} imported, {} skipped",
        session.total_count, session.imported, session.skipped
    );
    for e in &session.errors {
        println!("  ! {e}");
    }
    if !session.preview.is_empty() {
        println!("{}", preview_table(&session.preview));
    }
}

pub fn run(last: bool) -> Result<()> {
    let settings = load_settings();
    let history = load_history(&settings)?;

    if last {
        match history.last_session() {
            Some(session) => print_session(session),
            None => println!("No imports yet."),
        }
        return Ok(());
    }

    if history.sessions.is_empty() {
        println!("No imports yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["When", "File", "Source", "Status", "Parsed", "Imported", "Skipped", "Errors"]);
    for s in history.sessions.iter().rev() {
        table.add_row(vec![
            Cell::new(&s.timestamp),
            Cell::new(&s.file_name),
            Cell::new(&s.source),
            Cell::new(s.status.as_str()),
            Cell::new(s.total_count),
            Cell::new(s.imported),
            Cell::new(s.skipped),
            Cell::new(s.errors.len()),
        ]);
    }
    println!("Imports (newest first)\n{table}");
    Ok(())
}
