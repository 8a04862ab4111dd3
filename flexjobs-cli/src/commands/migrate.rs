//! Migrate command - apply pending migrations

use anyhow::Result;
use colored::Colorize;

use flexjobs_core::ports::MigrationSource;
use flexjobs_core::services::events;
use flexjobs_core::{Error, LogEvent, LoggingService, MigrationObserver, RunState};

use super::{get_context, get_logger, log_command, log_event};
use crate::output;

/// Prints progress and records per-migration events
struct ProgressObserver<'a> {
    logger: &'a Option<LoggingService>,
    json: bool,
    pending: Vec<String>,
    batch: i64,
}

impl MigrationObserver for ProgressObserver<'_> {
    fn on_state(&mut self, state: RunState) {
        if let RunState::Executing(index) = state {
            if !self.json {
                if let Some(filename) = self.pending.get(index) {
                    println!("  Running: {}", filename);
                }
            }
        }
    }

    fn on_pending(&mut self, pending: &[String], batch: i64) {
        self.pending = pending.to_vec();
        self.batch = batch;
        if !self.json {
            output::info(&format!(
                "Found {} pending migration(s), batch {}",
                pending.len(),
                batch
            ));
        }
    }

    fn on_applied(&mut self, filename: &str) {
        log_event(
            self.logger,
            LogEvent::new(events::MIGRATION_APPLIED)
                .with_command("migrate")
                .with_migration(filename)
                .with_batch(self.batch),
        );
        if !self.json {
            println!("  {} {}", "Completed:".green(), filename);
        }
    }

    fn on_failed(&mut self, filename: &str, _error: &Error) {
        if !self.json {
            println!("  {} {}", "Failed:".red(), filename);
        }
    }
}

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "migrate");

    let ctx = get_context()?;
    if !json {
        println!(
            "Migrating {} from {}",
            ctx.config.database.path.display(),
            ctx.manager.source().describe()
        );
    }

    let mut observer = ProgressObserver {
        logger: &logger,
        json,
        pending: Vec::new(),
        batch: 0,
    };

    match ctx.manager.run_pending_with(&mut observer) {
        Ok(report) => {
            let mut event = LogEvent::new(events::MIGRATE_COMPLETED).with_command("migrate");
            if let Some(batch) = report.batch {
                event = event.with_batch(batch);
            }
            log_event(&logger, event);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_noop() {
                output::success("No pending migrations");
            } else {
                output::success(&format!(
                    "Applied {} migration(s) in batch {}",
                    report.applied.len(),
                    report.batch.unwrap_or_default()
                ));
            }
            Ok(())
        }
        Err(e) => {
            let mut event = LogEvent::new(events::MIGRATE_FAILED)
                .with_command("migrate")
                .with_error(e.to_string())
                .with_error_details(e.root().to_string());
            if let Some(filename) = e.failed_migration() {
                event = event.with_migration(filename);
            }
            if observer.batch > 0 {
                event = event.with_batch(observer.batch);
            }
            log_event(&logger, event);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "success": false,
                        "completed": e.completed(),
                        "failed_migration": e.failed_migration(),
                        "error": e.root().to_string(),
                    }))?
                );
            } else {
                output::error(&format!(
                    "{} migration(s) succeeded before the failure",
                    e.completed()
                ));
                if let Some(filename) = e.failed_migration() {
                    output::error(&format!("Failed migration: {}", filename));
                }
            }
            Err(e.into())
        }
    }
}
