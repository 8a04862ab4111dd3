//! FlexJobs CLI - schema migrations for the FlexJobs database

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{check, logs, migrate, new, status};

/// FlexJobs - apply and inspect database migrations
#[derive(Parser)]
#[command(name = "flexjobs", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations
    #[command(visible_alias = "up")]
    Migrate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show applied and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify the database is reachable and report the ledger state
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new, empty migration file
    New {
        /// Migration name (prompted for if omitted)
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    // .env values must be visible before any configuration is read
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Migrate { json } => migrate::run(json),
        Commands::Status { json } => status::run(json),
        Commands::Check { json } => check::run(json),
        Commands::New { name, json } => new::run(name, json),
        Commands::Logs { command } => logs::run(command),
    }
}
