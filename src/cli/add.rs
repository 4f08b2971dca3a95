use colored::Colorize;

use crate::cli::{load_categorizer, load_ledger, parse_date_opt};
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::models::TransactionType;
use crate::settings::load_settings;

pub fn run(
    transaction_type: TransactionType,
    amount: f64,
    description: &str,
    category: Option<&str>,
    date: Option<&str>,
) -> Result<()> {
    let settings = load_settings();
    let mut ledger = load_ledger(&settings)?;
    let date = parse_date_opt(date)?;

    let (category, suggested) = match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => (c.to_string(), None),
        None => {
            let categorizer = load_categorizer(&settings)?;
            let (c, confidence) = categorizer.categorize(description, amount, transaction_type);
            (c, Some(confidence))
        }
    };

    let txn = ledger
        .add_transaction(amount, description, &category, transaction_type, date)?
        .clone();
    ledger.save(&settings.ledger_path())?;

    let amount_str = match transaction_type {
        TransactionType::Income => money(txn.amount).green(),
        TransactionType::Expense => money(txn.amount).red(),
    };
    print!("Added {transaction_type} {amount_str}: {} \u{2192} {}", txn.description, txn.category);
    match suggested {
        Some(confidence) => println!(" (suggested, {})", percent(confidence)),
        None => println!(),
    }
    println!("Balance: {}", money(ledger.balance()));
    Ok(())
}
