//! Logs command - inspect what past migration runs did

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use flexjobs_core::services::logging::now_ms;
use flexjobs_core::services::{events, RunSummary};
use flexjobs_core::{LogEntry, LogFilter, LoggingService};

use super::get_app_dir;
use crate::output;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show logged events, newest first
    List {
        /// Only events about this migration file
        #[arg(long, short = 'm')]
        migration: Option<String>,
        /// Only events from this batch
        #[arg(long, short = 'b')]
        batch: Option<i64>,
        /// Only events that carry an error
        #[arg(long)]
        errors: bool,
        #[arg(short, long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show the outcome of recent `migrate` runs
    Runs {
        /// Only runs that aborted
        #[arg(long)]
        failed: bool,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than N days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Event counts and log database location
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let app_dir = get_app_dir()?;
    std::fs::create_dir_all(&app_dir)?;
    Ok(LoggingService::new(&app_dir, env!("CARGO_PKG_VERSION"))?)
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            migration,
            batch,
            errors,
            limit,
            json,
        } => {
            let filter = LogFilter {
                errors_only: errors,
                migration,
                batch,
                limit: Some(limit),
                ..LogFilter::default()
            };
            list(&open_log()?.query(&filter)?, json)
        }
        LogsCommands::Runs { failed, limit, json } => {
            let mut runs = open_log()?.runs(limit)?;
            if failed {
                runs.retain(|run| !run.succeeded);
            }
            show_runs(&runs, json)
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(older_than_days, force, json),
        LogsCommands::Stats { json } => stats(json),
    }
}

fn list(entries: &[LogEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No matching events.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Migration", "Batch", "Error"]);
    for entry in entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            entry.migration.clone().unwrap_or_default(),
            entry.batch.map(|b| b.to_string()).unwrap_or_default(),
            entry.error_details.clone().or_else(|| entry.error_message.clone()).unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn show_runs(runs: &[RunSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(runs)?);
        return Ok(());
    }
    if runs.is_empty() {
        println!("No migrate runs recorded.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Result", "Batch", "Failed Migration", "Error"]);
    for run in runs {
        let result = if run.succeeded {
            "ok".green().to_string()
        } else {
            "aborted".red().to_string()
        };
        table.add_row(vec![
            format_timestamp(run.timestamp),
            result,
            run.batch.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
            run.failed_migration.clone().unwrap_or_default(),
            run.error.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn clear(older_than_days: u64, force: bool, json: bool) -> Result<()> {
    let service = open_log()?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete events older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = service.delete_before(now_ms() - older_than_days as i64 * DAY_MS)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!("Deleted {} event(s)", deleted));
    }
    Ok(())
}

fn stats(json: bool) -> Result<()> {
    let service = open_log()?;
    let stats = service.stats()?;
    let db_path = service.db_path();
    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "stats": stats,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes,
            }))?
        );
        return Ok(());
    }

    println!("{}", "Event Log".bold());
    println!("  Database: {} ({})", db_path.display(), output::format_size(size_bytes));
    println!("  Events:   {}", stats.total);
    println!("  Errors:   {}", stats.errors);

    if !stats.by_event.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Event", "Count"]);
        for (event, count) in &stats.by_event {
            let name = if event == events::MIGRATE_FAILED {
                event.red().to_string()
            } else {
                event.clone()
            };
            table.add_row(vec![name, count.to_string()]);
        }
        println!("{}", table);
    }
    Ok(())
}
