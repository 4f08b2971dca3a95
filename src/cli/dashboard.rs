use chrono::{Datelike, Local};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::cli::load_ledger;
use crate::cli::summary::health_label;
use crate::error::Result;
use crate::fmt::money;
use crate::ledger::{HealthStatus, Ledger};
use crate::models::{CategorySpending, Transaction};
use crate::settings::load_settings;
use crate::tui::{run_view, Theme, View, ViewAction};

/// Categories shown in the spending panel; the rest are summarised.
const MAX_CATEGORIES: usize = 5;
const BAR_WIDTH: usize = 15;

struct DashboardData {
    total_income: f64,
    total_expenses: f64,
    balance: f64,
    health: HealthStatus,
    month_income: f64,
    month_expenses: f64,
    spending: Vec<CategorySpending>,
    recent: Vec<Transaction>,
}

impl DashboardData {
    fn from_ledger(ledger: &Ledger, recent_limit: usize) -> Self {
        let today = Local::now().date_naive();
        let (month_income, month_expenses) = ledger.month_totals(today.year(), today.month());
        Self {
            total_income: ledger.total_income(),
            total_expenses: ledger.total_expenses(),
            balance: ledger.balance(),
            health: ledger.health_status(),
            month_income,
            month_expenses,
            spending: ledger.spending_by_category(),
            recent: ledger
                .recent_transactions(recent_limit)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

pub struct Dashboard {
    data: DashboardData,
    selected: usize,
}

impl Dashboard {
    fn new(data: DashboardData) -> Self {
        Self { data, selected: 0 }
    }

    fn draw_stats(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let d = &self.data;
        let health_style = match d.health {
            HealthStatus::Healthy => theme.income,
            HealthStatus::Watch => theme.low_confidence,
            HealthStatus::Alert => theme.expense,
        };
        let lines = vec![
            Line::from(vec![
                Span::raw(" Income         "),
                Span::styled(money(d.total_income), theme.income),
            ]),
            Line::from(vec![
                Span::raw(" Expenses       "),
                Span::styled(money(d.total_expenses), theme.expense),
            ]),
            Line::from(vec![Span::raw(" Balance        "), theme.balance_span(d.balance)]),
            Line::from(vec![
                Span::raw(" Status         "),
                Span::styled(health_label(d.health), health_style),
            ]),
            Line::from(vec![
                Span::raw(" This month     "),
                Span::styled(money(d.month_income), theme.income),
                Span::styled(" / ", theme.muted),
                Span::styled(money(d.month_expenses), theme.expense),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_spending(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let mut lines = vec![Line::from(Span::styled(
            " Spending by Category",
            Style::default().add_modifier(Modifier::BOLD),
        ))];

        if self.data.spending.is_empty() {
            lines.push(Line::from(Span::styled(" No expenses yet.", theme.muted)));
        }

        let total = self.data.total_expenses;
        for s in self.data.spending.iter().take(MAX_CATEGORIES) {
            let share = if total > 0.0 { s.amount / total } else { 0.0 };
            let filled = ((share * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<18.18}", s.category)),
                Span::styled("\u{2588}".repeat(filled), theme.expense),
                Span::styled("\u{2591}".repeat(BAR_WIDTH - filled), theme.muted),
                Span::raw(format!(" {:>11}", money(s.amount))),
                Span::styled(format!(" ({})", s.count), theme.muted),
            ]));
        }
        if self.data.spending.len() > MAX_CATEGORIES {
            lines.push(Line::from(Span::styled(
                format!(" \u{2026} and {} more", self.data.spending.len() - MAX_CATEGORIES),
                theme.muted,
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_recent(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let mut lines = vec![Line::from(Span::styled(
            " Recent Transactions",
            Style::default().add_modifier(Modifier::BOLD),
        ))];

        if self.data.recent.is_empty() {
            lines.push(Line::from(Span::styled(
                " Nothing here yet. Try `tally import <file.csv>`.",
                theme.muted,
            )));
        }

        for (i, t) in self.data.recent.iter().enumerate() {
            let marker = if t.is_imported { "\u{21e3}" } else { " " };
            let mut line = Line::from(vec![
                Span::raw(format!(" {} ", t.date.format("%b %d"))),
                Span::raw(format!("{:<32.32} ", t.description)),
                Span::styled(format!("{:<18.18} ", t.category), theme.muted),
                theme.amount_span(t.amount, t.transaction_type),
                Span::styled(format!(" {marker}"), theme.muted),
            ]);
            if i == self.selected {
                line = line.style(theme.selected);
            }
            lines.push(line);
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

impl View for Dashboard {
    fn draw(&mut self, frame: &mut Frame, theme: &Theme) {
        let area = frame.area();

        let [header_area, sep1, top_area, sep2, recent_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(MAX_CATEGORIES as u16 + 2),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(Paragraph::new(" tally").style(theme.header), header_area);

        let sep_line = "\u{2501}".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(theme.border);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget, sep2);

        let [left_area, right_area] =
            Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                .areas(top_area);
        self.draw_stats(frame, left_area, theme);
        self.draw_spending(frame, right_area, theme);
        self.draw_recent(frame, recent_area, theme);

        frame.render_widget(
            Paragraph::new(" Up/Down=select  q/Esc=quit").style(theme.footer),
            hints_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Close,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.data.recent.len() {
                    self.selected += 1;
                }
            }
            _ => {}
        }
        ViewAction::Continue
    }
}

pub fn run(theme: &Theme) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger(&settings)?;
    let mut dashboard = Dashboard::new(DashboardData::from_ledger(&ledger, settings.recent_limit));
    run_view(&mut dashboard, theme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;

    fn dashboard_with(n: usize) -> Dashboard {
        let mut ledger = Ledger::default();
        for i in 0..n {
            ledger
                .add_transaction(
                    10.0 + i as f64,
                    "Coffee",
                    "Food & Dining",
                    TransactionType::Expense,
                    chrono::Utc::now(),
                )
                .unwrap();
        }
        Dashboard::new(DashboardData::from_ledger(&ledger, 10))
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut d = dashboard_with(2);
        d.handle_key(KeyCode::Up);
        assert_eq!(d.selected, 0);
        d.handle_key(KeyCode::Down);
        d.handle_key(KeyCode::Down);
        d.handle_key(KeyCode::Down);
        assert_eq!(d.selected, 1);
    }

    #[test]
    fn test_quit_keys_close() {
        let mut d = dashboard_with(0);
        assert!(matches!(d.handle_key(KeyCode::Char('q')), ViewAction::Close));
        assert!(matches!(d.handle_key(KeyCode::Esc), ViewAction::Close));
        assert!(matches!(d.handle_key(KeyCode::Char('x')), ViewAction::Continue));
    }

    #[test]
    fn test_data_snapshot() {
        let d = dashboard_with(3);
        assert_eq!(d.data.recent.len(), 3);
        assert_eq!(d.data.spending.len(), 1);
        assert_eq!(d.data.spending[0].count, 3);
        assert_eq!(d.data.total_expenses, 33.0);
        assert_eq!(d.data.balance, -33.0);
        assert_eq!(d.data.health, HealthStatus::Watch);
    }
}
