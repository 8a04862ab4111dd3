//! Status command - show applied and pending migrations

use anyhow::Result;
use colored::Colorize;

use flexjobs_core::MigrationStatus;

use super::{get_context, get_logger, log_command};
use crate::output;

/// Always succeeds; a status that cannot be read is reported as a warning
pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "status");

    let status = get_context().and_then(|ctx| ctx.manager.status().map_err(anyhow::Error::from));

    match status {
        Ok(status) if json => println!("{}", serde_json::to_string_pretty(&status)?),
        Ok(status) => print_status(&status),
        Err(e) if json => println!(
            "{}",
            serde_json::json!({ "success": false, "error": format!("{:#}", e) })
        ),
        Err(e) => output::warning(&format!("Could not read migration status: {:#}", e)),
    }

    Ok(())
}

fn print_status(status: &MigrationStatus) {
    println!("{}", "Migration Status".bold());
    println!("  Executed: {}", status.applied_count());
    println!("  Pending:  {}", status.pending_count());
    println!();

    if !status.applied.is_empty() {
        println!("{}", "Executed Migrations".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Filename", "Batch", "Executed At"]);
        for record in &status.applied {
            table.add_row(vec![
                record.filename.clone(),
                record.batch.to_string(),
                record.executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        println!("{}", table);
        println!();
    }

    if status.is_up_to_date() {
        output::success("Database is up to date");
    } else {
        println!("{}", "Pending Migrations".bold());
        for filename in &status.pending {
            println!("  - {}", filename.yellow());
        }
    }
}
