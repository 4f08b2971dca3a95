pub mod add;
pub mod dashboard;
pub mod history;
pub mod import;
pub mod init;
pub mod review;
pub mod rules;
pub mod summary;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::categorizer::Categorizer;
use crate::error::{Result, TallyError};
use crate::history::ImportHistory;
use crate::ledger::Ledger;
use crate::rules::RuleStore;
use crate::settings::Settings;

pub(crate) fn load_ledger(settings: &Settings) -> Result<Ledger> {
    Ledger::load(&settings.ledger_path(), settings.load_mode)
}

pub(crate) fn load_categorizer(settings: &Settings) -> Result<Categorizer> {
    let store = RuleStore::load(&settings.rules_path(), settings.load_mode)?;
    Ok(Categorizer::new(store))
}

pub(crate) fn load_history(settings: &Settings) -> Result<ImportHistory> {
    ImportHistory::load(&settings.history_path(), settings.load_mode)
}

/// YYYY-MM-DD at noon UTC, so the calendar day survives any local offset.
pub(crate) fn parse_date_opt(date: Option<&str>) -> Result<DateTime<Utc>> {
    match date {
        None => Ok(Utc::now()),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| TallyError::Other(format!("Invalid date '{raw}', expected YYYY-MM-DD"))),
    }
}

#[derive(Parser)]
#[command(name = "tally", about = "Personal budget book with bank CSV import and auto-categorization.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and write the settings file.
    Init {
        /// Path for tally data (default: ~/.tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Refuse to start over when a data file is corrupt
        #[arg(long)]
        strict: bool,
    },
    /// Open the interactive dashboard (default).
    Dashboard,
    /// Record income.
    Income {
        amount: f64,
        description: String,
        /// Category (default: suggested by the rules)
        #[arg(long)]
        category: Option<String>,
        /// Date: YYYY-MM-DD (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Record an expense.
    Expense {
        amount: f64,
        description: String,
        /// Category (default: suggested by the rules)
        #[arg(long)]
        category: Option<String>,
        /// Date: YYYY-MM-DD (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Totals, balance and spending by category.
    Summary,
    /// List transactions, newest first.
    Transactions {
        /// Only this category
        #[arg(long)]
        category: Option<String>,
        /// Maximum rows (default: recent_limit setting)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Import a bank CSV export and auto-categorize it.
    Import {
        /// Path to the CSV file
        file: String,
        /// Format key (see `tally formats`); detected when omitted
        #[arg(long)]
        format: Option<String>,
        /// Show the preview without saving anything
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Review an import interactively before committing it.
    Review {
        /// Path to the CSV file
        file: String,
        /// Format key (see `tally formats`); detected when omitted
        #[arg(long)]
        format: Option<String>,
    },
    /// Show how a description would be categorized and by which rule.
    Categorize {
        description: String,
        #[arg(long, default_value = "0")]
        amount: f64,
        /// Treat as income instead of expense
        #[arg(long)]
        income: bool,
    },
    /// Manage categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// List the known bank CSV formats.
    Formats,
    /// Show recent import sessions.
    History {
        /// Only the most recent session
        #[arg(long)]
        last: bool,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a categorization rule.
    Add {
        /// Category to assign
        category: String,
        /// Regex matched case-insensitively against descriptions
        #[arg(long)]
        pattern: Option<String>,
        /// Literal substring; repeat for several
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Only amounts >= this
        #[arg(long = "min-amount")]
        min_amount: Option<f64>,
        /// Only amounts <= this
        #[arg(long = "max-amount")]
        max_amount: Option<f64>,
        /// Only income or expense
        #[arg(long = "type")]
        transaction_type: Option<String>,
        /// Rule priority (higher wins, 100 = full confidence)
        #[arg(long, default_value = "80")]
        priority: i64,
    },
    /// List all rules, highest priority first.
    List,
    /// List every category the rules can assign.
    Categories,
}
