use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::Frame;

use crate::error::Result;
use crate::fmt::{money, percent};
use crate::models::TransactionType;

/// Colours for the interactive screens. Built once in `main` and handed to
/// each view; nothing outside the views reads it.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub header: Style,
    pub footer: Style,
    pub border: Style,
    pub income: Style,
    pub expense: Style,
    pub selected: Style,
    pub muted: Style,
    pub high_confidence: Style,
    pub low_confidence: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header: Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            footer: Style::new().fg(Color::DarkGray),
            border: Style::new().fg(Color::DarkGray),
            income: Style::new().fg(Color::Rgb(80, 220, 100)),
            expense: Style::new().fg(Color::Red),
            selected: Style::new()
                .bg(Color::Rgb(40, 40, 60))
                .add_modifier(Modifier::BOLD),
            muted: Style::new().fg(Color::Gray),
            high_confidence: Style::new().fg(Color::Cyan),
            low_confidence: Style::new().fg(Color::Yellow),
        }
    }
}

/// Confidence at or above which a suggested category is shown as trusted.
pub const TRUSTED_CONFIDENCE: f64 = 0.7;

impl Theme {
    /// Absolute amount coloured by type; colour conveys the sign.
    pub fn amount_span(&self, amount: f64, transaction_type: TransactionType) -> Span<'static> {
        let style = match transaction_type {
            TransactionType::Income => self.income,
            TransactionType::Expense => self.expense,
        };
        Span::styled(money(amount.abs()), style)
    }

    pub fn balance_span(&self, balance: f64) -> Span<'static> {
        let style = if balance < 0.0 { self.expense } else { self.income };
        Span::styled(money(balance), style)
    }

    pub fn confidence_span(&self, confidence: f64) -> Span<'static> {
        let style = if confidence >= TRUSTED_CONFIDENCE {
            self.high_confidence
        } else {
            self.low_confidence
        };
        Span::styled(format!("{:>4}", percent(confidence)), style)
    }
}

pub enum ViewAction {
    Continue,
    Close,
}

pub trait View {
    fn draw(&mut self, frame: &mut Frame, theme: &Theme);
    fn handle_key(&mut self, code: KeyCode) -> ViewAction;
}

/// Run an interactive ratatui view. Sets up the terminal, event loop,
/// and panic hook, then restores the terminal on exit.
pub fn run_view(view: &mut dyn View, theme: &Theme) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| view.draw(frame, theme)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                match view.handle_key(key.code) {
                    ViewAction::Close => break Ok(()),
                    ViewAction::Continue => {}
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}
