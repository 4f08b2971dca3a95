use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::load_ledger;
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::ledger::{HealthStatus, Ledger};
use crate::models::Transaction;
use crate::settings::load_settings;

pub(crate) fn health_label(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "Healthy",
        HealthStatus::Watch => "Watch your spending",
        HealthStatus::Alert => "Budget alert",
    }
}

fn transactions_table(rows: &[&Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Category", "Amount", "Source"]);
    for t in rows {
        let source = if t.is_imported {
            format!("{} ({})", t.import_source, percent(t.confidence))
        } else {
            "manual".to_string()
        };
        table.add_row(vec![
            Cell::new(t.date.format("%Y-%m-%d")),
            Cell::new(&t.description),
            Cell::new(&t.category),
            Cell::new(money(t.signed_amount())),
            Cell::new(source),
        ]);
    }
    table
}

fn print_totals(ledger: &Ledger) {
    let balance = ledger.balance();
    let balance_str = if balance < 0.0 {
        money(balance).red()
    } else {
        money(balance).green()
    };
    println!("Income:    {}", money(ledger.total_income()).green());
    println!("Expenses:  {}", money(ledger.total_expenses()).red());
    println!("Balance:   {balance_str}");
    println!("Status:    {}", health_label(ledger.health_status()).bold());
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger(&settings)?;

    if ledger.transactions.is_empty() {
        println!("No transactions yet. Add one with `tally expense` or import a CSV.");
        return Ok(());
    }

    print_totals(&ledger);

    let spending = ledger.spending_by_category();
    if !spending.is_empty() {
        let total = ledger.total_expenses();
        let mut table = Table::new();
        table.set_header(vec!["Category", "Spent", "Items", "Share"]);
        for s in &spending {
            let share = if total > 0.0 { s.amount / total } else { 0.0 };
            table.add_row(vec![
                Cell::new(&s.category),
                Cell::new(money(s.amount)),
                Cell::new(s.count),
                Cell::new(percent(share)),
            ]);
        }
        println!("\nSpending by category\n{table}");
    }

    let recent = ledger.recent_transactions(settings.recent_limit);
    println!("\nRecent transactions\n{}", transactions_table(&recent));
    Ok(())
}

pub fn list(category: Option<&str>, limit: Option<usize>) -> Result<()> {
    let settings = load_settings();
    let ledger = load_ledger(&settings)?;
    let limit = limit.unwrap_or(settings.recent_limit);

    let rows: Vec<&Transaction> = match category {
        Some(c) => {
            let mut rows = ledger.transactions_by_category(c);
            rows.sort_by(|a, b| b.date.cmp(&a.date));
            rows.truncate(limit);
            rows
        }
        None => ledger.recent_transactions(limit),
    };

    if rows.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }
    println!("{}", transactions_table(&rows));
    Ok(())
}
