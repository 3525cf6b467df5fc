//! Oyster CLI - encrypted personal finance records in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{backup, categorize, import, logs, register, rules, status, transactions, Credentials};

/// Oyster - encrypted personal finance records
#[derive(Parser)]
#[command(name = "oyster", version, about, long_about = None)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user
    Register {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Import transactions from a bank CSV export
    Import {
        /// Path to CSV file
        file: PathBuf,
        #[command(flatten)]
        creds: Credentials,
        /// Apply categorization rules after importing
        #[arg(long)]
        categorize: bool,
    },

    /// List transactions
    Transactions {
        #[command(flatten)]
        creds: Credentials,
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only uncategorized transactions
        #[arg(long)]
        uncategorized: bool,
    },

    /// Manage categorization rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Apply categorization rules to uncategorized transactions
    Categorize {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Show a summary of a user's data
    Status {
        #[command(flatten)]
        creds: Credentials,
    },

    /// Manage backups
    Backup {
        #[command(subcommand)]
        command: backup::BackupCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                output::json_error(&e);
            } else {
                output::error(&format!("Error: {:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Register { creds } => register::run(creds, json),
        Commands::Import { file, creds, categorize } => import::run(&file, creds, categorize, json),
        Commands::Transactions { creds, limit, uncategorized } => {
            transactions::run(creds, limit, uncategorized, json)
        }
        Commands::Rules { command } => rules::run(command, json),
        Commands::Categorize { creds } => categorize::run(creds, json),
        Commands::Status { creds } => status::run(creds, json),
        Commands::Backup { command } => backup::run(command, json),
        Commands::Logs { command } => logs::run(command, json),
    }
}
