mod categorizer;
mod cli;
mod error;
mod fmt;
mod formats;
mod history;
mod importer;
mod ledger;
mod models;
mod rules;
mod settings;
mod storage;
mod tui;

use clap::Parser;

use cli::{Cli, Commands, RulesCommands};
use models::TransactionType;
use tui::Theme;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let theme = Theme::default();

    let result = match cli.command {
        None | Some(Commands::Dashboard) => cli::dashboard::run(&theme),
        Some(Commands::Init { data_dir, strict }) => cli::init::run(data_dir, strict),
        Some(Commands::Income {
            amount,
            description,
            category,
            date,
        }) => cli::add::run(
            TransactionType::Income,
            amount,
            &description,
            category.as_deref(),
            date.as_deref(),
        ),
        Some(Commands::Expense {
            amount,
            description,
            category,
            date,
        }) => cli::add::run(
            TransactionType::Expense,
            amount,
            &description,
            category.as_deref(),
            date.as_deref(),
        ),
        Some(Commands::Summary) => cli::summary::run(),
        Some(Commands::Transactions { category, limit }) => {
            cli::summary::list(category.as_deref(), limit)
        }
        Some(Commands::Import {
            file,
            format,
            dry_run,
        }) => cli::import::run(&file, format.as_deref(), dry_run),
        Some(Commands::Review { file, format }) => {
            cli::review::run(&file, format.as_deref(), &theme)
        }
        Some(Commands::Categorize {
            description,
            amount,
            income,
        }) => cli::rules::explain(&description, amount, income),
        Some(Commands::Rules { command }) => match command {
            RulesCommands::Add {
                category,
                pattern,
                keywords,
                min_amount,
                max_amount,
                transaction_type,
                priority,
            } => cli::rules::add(
                &category,
                pattern.as_deref(),
                &keywords,
                min_amount,
                max_amount,
                transaction_type.as_deref(),
                priority,
            ),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Categories => cli::rules::categories(),
        },
        Some(Commands::Formats) => cli::import::formats(),
        Some(Commands::History { last }) => cli::history::run(last),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
