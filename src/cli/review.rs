use std::path::PathBuf;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::cli::import::{preview_or_record, resolve_format};
use crate::cli::{load_categorizer, load_history, load_ledger};
use crate::error::Result;
use crate::fmt::money;
use crate::importer::{commit_import, import_session, ImportResult};
use crate::models::PreviewTransaction;
use crate::settings::load_settings;
use crate::tui::{run_view, Theme, View, ViewAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Pending,
    Commit,
    Cancel,
}

pub struct ImportReview {
    file_name: String,
    format_name: String,
    total_rows: usize,
    success_count: usize,
    errors: Vec<String>,
    preview: Vec<PreviewTransaction>,
    selected: usize,
    show_details: bool,
    decision: Decision,
}

impl ImportReview {
    fn new(file_name: &str, result: &ImportResult, preview: Vec<PreviewTransaction>) -> Self {
        Self {
            file_name: file_name.to_string(),
            format_name: result.format.name.clone(),
            total_rows: result.total_rows,
            success_count: result.success_count,
            errors: result.errors.clone(),
            preview,
            selected: 0,
            show_details: false,
            decision: Decision::Pending,
        }
    }

    fn draw_summary(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let lines = vec![
            Line::from(vec![
                Span::raw(" File      "),
                Span::styled(self.file_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(format!(" Format    {}", self.format_name)),
            Line::from(vec![
                Span::raw(format!(" Rows      {} of {} parsed", self.success_count, self.total_rows)),
                if self.errors.is_empty() {
                    Span::raw("")
                } else {
                    Span::styled(format!(", {} with errors", self.errors.len()), theme.expense)
                },
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_preview(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let mut lines = vec![Line::from(Span::styled(
            format!(" Preview (first {})", self.preview.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if self.preview.is_empty() {
            lines.push(Line::from(Span::styled(" No transactions to import.", theme.muted)));
        }
        for (i, p) in self.preview.iter().enumerate() {
            let mut line = Line::from(vec![
                Span::raw(format!(" {:<7}", p.date)),
                Span::raw(format!("{:<32.32} ", p.description)),
                Span::raw(format!("{:>11} ", money(p.amount))),
                Span::raw(format!("{:<18.18} ", p.category)),
                theme.confidence_span(p.confidence),
            ]);
            if i == self.selected {
                line = line.style(theme.selected);
            }
            lines.push(line);
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_errors(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let mut lines = vec![Line::from(Span::styled(
            " Rows that could not be read",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if self.errors.is_empty() {
            lines.push(Line::from(Span::styled(" None.", theme.muted)));
        }
        for e in &self.errors {
            lines.push(Line::from(Span::styled(format!(" {e}"), theme.expense)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

impl View for ImportReview {
    fn draw(&mut self, frame: &mut Frame, theme: &Theme) {
        let area = frame.area();

        let [header_area, sep1, summary_area, sep2, content_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(Paragraph::new(" Review Import").style(theme.header), header_area);
        let sep_line = "\u{2501}".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(theme.border);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget, sep2);

        self.draw_summary(frame, summary_area, theme);
        if self.show_details {
            self.draw_errors(frame, content_area, theme);
        } else {
            self.draw_preview(frame, content_area, theme);
        }

        frame.render_widget(
            Paragraph::new(" Up/Down=select  d=errors  c=commit  Esc=cancel").style(theme.footer),
            hints_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.decision = Decision::Cancel;
                return ViewAction::Close;
            }
            KeyCode::Char('c') => {
                self.decision = Decision::Commit;
                return ViewAction::Close;
            }
            KeyCode::Char('d') => self.show_details = !self.show_details,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.preview.len() {
                    self.selected += 1;
                }
            }
            _ => {}
        }
        ViewAction::Continue
    }
}

pub fn run(file: &str, format_key: Option<&str>, theme: &Theme) -> Result<()> {
    let file_path = PathBuf::from(file);
    let settings = load_settings();
    let categorizer = load_categorizer(&settings)?;
    let mut history = load_history(&settings)?;

    let format = resolve_format(&file_path, format_key)?;
    let (result, preview) =
        preview_or_record(&settings, &mut history, &file_path, &format, &categorizer)?;

    let display_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string());
    let mut review = ImportReview::new(&display_name, &result, preview);
    run_view(&mut review, theme)?;

    if review.decision != Decision::Commit {
        println!("Import cancelled; nothing saved.");
        return Ok(());
    }

    let mut ledger = load_ledger(&settings)?;
    let outcome = commit_import(&mut ledger, &categorizer, &result);
    ledger.save(&settings.ledger_path())?;

    history.add_session(import_session(&file_path, &result, review.preview, outcome));
    history.save(&settings.history_path())?;

    println!(
        "{} imported, {} skipped (already in ledger)",
        outcome.imported, outcome.skipped
    );
    Ok(())
}
