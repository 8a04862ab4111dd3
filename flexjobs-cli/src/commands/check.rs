//! Check command - verify the database is reachable before migrating

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};

use flexjobs_core::ports::MigrationSource;
use flexjobs_core::{FlexJobsContext, HealthReport};

use super::{get_context, get_logger, log_command};
use crate::output;

fn key_state(key: &Option<String>) -> &'static str {
    match key.as_deref() {
        Some(k) if !k.is_empty() => "[SET]",
        _ => "[EMPTY]",
    }
}

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "check");

    let ctx = get_context()?;
    if !json {
        print_config(&ctx);
    }

    let report = match ctx.manager.check() {
        Ok(report) => report,
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "success": false, "error": e.to_string() })
                );
            } else {
                println!("  {} {}", "Connection:".bold(), "FAIL".red());
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_config(ctx: &FlexJobsContext) {
    println!("{}", "Configuration".bold());
    println!("  Database:       {}", ctx.config.database.path.display());
    println!("  Encryption key: {}", key_state(&ctx.config.database.encryption_key));
    println!("  Migrations:     {}", ctx.manager.source().describe());
    println!();
}

fn print_report(report: &HealthReport) {
    let mut table = output::create_table();
    table.set_header(vec!["Check", "Status", "Detail"]);
    table.add_row(vec![
        Cell::new("Connection"),
        Cell::new("PASS").fg(Color::Green),
        Cell::new(format!("DuckDB {}", report.engine_version)),
    ]);

    let (ledger_status, ledger_detail) = if report.ledger_present {
        (
            Cell::new("PASS").fg(Color::Green),
            format!("{} applied", report.applied),
        )
    } else {
        (
            Cell::new("WARN").fg(Color::Yellow),
            "schema_migrations not created yet".to_string(),
        )
    };
    table.add_row(vec![Cell::new("Ledger"), ledger_status, Cell::new(ledger_detail)]);
    table.add_row(vec![
        Cell::new("Pending"),
        Cell::new(report.pending.to_string()),
        Cell::new(""),
    ]);
    println!("{}", table);

    if report.pending == 0 {
        output::success("Database is reachable and up to date");
    } else {
        output::info(&format!(
            "Database is reachable; run `flexjobs migrate` to apply {} migration(s)",
            report.pending
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_never_printed() {
        assert_eq!(key_state(&Some("hunter2".to_string())), "[SET]");
        assert_eq!(key_state(&Some(String::new())), "[EMPTY]");
        assert_eq!(key_state(&None), "[EMPTY]");
    }
}
