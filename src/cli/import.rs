use std::path::{Path, PathBuf};

use comfy_table::{Cell, Table};

use crate::cli::{load_categorizer, load_history, load_ledger};
use crate::error::{Result, TallyError};
use crate::fmt::{money, percent};
use crate::formats::{detect_format, get_by_key, CsvFormat, ALL_FORMATS};
use crate::history::ImportHistory;
use crate::categorizer::Categorizer;
use crate::importer::{commit_import, failed_session, import_preview, import_session, ImportResult};
use crate::models::PreviewTransaction;
use crate::settings::{load_settings, Settings};

pub(crate) fn resolve_format(file_path: &Path, format_key: Option<&str>) -> Result<CsvFormat> {
    match format_key {
        Some(key) => get_by_key(key).ok_or_else(|| TallyError::UnknownFormat(key.to_string())),
        None => Ok(detect_format(file_path)),
    }
}

/// Parse and preview the file, recording a failed session in the history
/// when the file itself cannot be read.
pub(crate) fn preview_or_record(
    settings: &Settings,
    history: &mut ImportHistory,
    file_path: &Path,
    format: &CsvFormat,
    categorizer: &Categorizer,
) -> Result<(ImportResult, Vec<PreviewTransaction>)> {
    match import_preview(file_path, format, settings.preview_rows, categorizer) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            history.add_session(failed_session(file_path, &format.name, &e.to_string()));
            if let Err(save_err) = history.save(&settings.history_path()) {
                log::warn!("could not record failed import: {save_err}");
            }
            Err(e)
        }
    }
}

pub(crate) fn preview_table(preview: &[PreviewTransaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Category", "Confidence"]);
    for p in preview {
        table.add_row(vec![
            Cell::new(&p.date),
            Cell::new(&p.description),
            Cell::new(money(p.amount)),
            Cell::new(&p.category),
            Cell::new(percent(p.confidence)),
        ]);
    }
    table
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("{} row(s) could not be read:", errors.len());
    for e in errors {
        println!("  {e}");
    }
}

pub fn run(file: &str, format_key: Option<&str>, dry_run: bool) -> Result<()> {
    let file_path = PathBuf::from(file);
    let settings = load_settings();
    let categorizer = load_categorizer(&settings)?;
    let mut history = load_history(&settings)?;

    let format = resolve_format(&file_path, format_key)?;
    let (result, preview) =
        preview_or_record(&settings, &mut history, &file_path, &format, &categorizer)?;

    println!(
        "Format: {} ({} of {} rows parsed)",
        format.name, result.success_count, result.total_rows
    );
    print_errors(&result.errors);

    if !preview.is_empty() {
        println!("{}", preview_table(&preview));
    }

    if dry_run {
        println!("Dry run: nothing saved.");
        return Ok(());
    }

    let mut ledger = load_ledger(&settings)?;
    let outcome = commit_import(&mut ledger, &categorizer, &result);
    ledger.save(&settings.ledger_path())?;

    history.add_session(import_session(&file_path, &result, preview, outcome));
    history.save(&settings.history_path())?;

    println!(
        "{} imported, {} skipped (already in ledger)",
        outcome.imported, outcome.skipped
    );
    Ok(())
}

pub fn formats() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Bank", "Date", "Description", "Amount", "Date format", "Header", "Signed"]);
    for bank in ALL_FORMATS {
        let f = bank.format();
        table.add_row(vec![
            Cell::new(&f.key),
            Cell::new(&f.name),
            Cell::new(f.date_column),
            Cell::new(f.description_column),
            Cell::new(f.amount_column),
            Cell::new(&f.date_format),
            Cell::new(if f.has_header { "yes" } else { "no" }),
            Cell::new(if f.amount_is_signed { "yes" } else { "no" }),
        ]);
    }
    println!("Formats (tried in this order; the last is the fallback)\n{table}");
    Ok(())
}
