use comfy_table::{Cell, Table};

use crate::categorizer::MatchKind;
use crate::cli::load_categorizer;
use crate::error::{Result, TallyError};
use crate::fmt::{money, percent};
use crate::models::{CategorizationRule, TransactionType};
use crate::rules::default_rules;
use crate::settings::load_settings;

#[allow(clippy::too_many_arguments)]
pub fn add(
    category: &str,
    pattern: Option<&str>,
    keywords: &[String],
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    transaction_type: Option<&str>,
    priority: i64,
) -> Result<()> {
    let transaction_type = match transaction_type {
        Some(raw) => Some(TransactionType::parse(raw).ok_or_else(|| {
            TallyError::InvalidRule(format!("type must be income or expense, got '{raw}'"))
        })?),
        None => None,
    };

    let mut rule = CategorizationRule::new(category.trim(), priority);
    if let Some(pattern) = pattern {
        rule = rule.with_pattern(pattern);
    }
    rule.keywords = keywords.to_vec();
    if let Some(min) = min_amount {
        rule = rule.with_min_amount(min);
    }
    if let Some(max) = max_amount {
        rule = rule.with_max_amount(max);
    }
    if let Some(t) = transaction_type {
        rule = rule.for_type(t);
    }

    let settings = load_settings();
    let mut categorizer = load_categorizer(&settings)?;
    categorizer.add_custom_rule(rule)?;
    println!("Added rule \u{2192} {category} (priority {priority})");
    Ok(())
}

fn bounds(rule: &CategorizationRule) -> String {
    let min = rule.min_amount.filter(|v| *v != 0.0);
    let max = rule.max_amount.filter(|v| *v != 0.0);
    match (min, max) {
        (None, None) => String::new(),
        (Some(lo), None) => format!(">= {}", money(lo)),
        (None, Some(hi)) => format!("<= {}", money(hi)),
        (Some(lo), Some(hi)) => format!("{} \u{2013} {}", money(lo), money(hi)),
    }
}

pub fn list() -> Result<()> {
    let settings = load_settings();
    let categorizer = load_categorizer(&settings)?;
    let defaults = default_rules();

    let mut table = Table::new();
    table.set_header(vec!["Priority", "Category", "Pattern", "Keywords", "Amount", "Type", "Origin"]);
    for rule in categorizer.rules() {
        let origin = if defaults
            .iter()
            .any(|d| d.pattern == rule.pattern && d.category == rule.category)
        {
            "default"
        } else {
            "custom"
        };
        let status = if rule.is_active { "" } else { " (inactive)" };
        table.add_row(vec![
            Cell::new(rule.priority),
            Cell::new(format!("{}{status}", rule.category)),
            Cell::new(&rule.pattern),
            Cell::new(rule.keywords.join(", ")),
            Cell::new(bounds(rule)),
            Cell::new(rule.transaction_type.map(|t| t.as_str()).unwrap_or("any")),
            Cell::new(origin),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn categories() -> Result<()> {
    let settings = load_settings();
    let categorizer = load_categorizer(&settings)?;
    for category in categorizer.all_categories() {
        println!("{category}");
    }
    Ok(())
}

pub fn explain(description: &str, amount: f64, income: bool) -> Result<()> {
    let settings = load_settings();
    let categorizer = load_categorizer(&settings)?;
    let transaction_type = if income {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };

    match categorizer.explain(description, amount, transaction_type) {
        None => println!("Uncategorized (no rule matched)"),
        Some(m) => {
            let how = match m.kind {
                MatchKind::Pattern => format!("pattern '{}'", m.rule.pattern),
                MatchKind::Keyword => format!("keywords [{}]", m.rule.keywords.join(", ")),
            };
            println!("{} ({})", m.rule.category, percent(m.confidence));
            println!("  matched {how} at priority {}", m.rule.priority);
        }
    }
    Ok(())
}
