//! CLI command implementations

pub mod check;
pub mod logs;
pub mod migrate;
pub mod new;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use flexjobs_core::{FlexJobsContext, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let app_dir = get_app_dir().ok()?;
    std::fs::create_dir_all(&app_dir).ok()?;
    LoggingService::new(&app_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Record that a command was invoked
pub fn log_command(logger: &Option<LoggingService>, command: &str) {
    if let Some(l) = logger {
        let _ = l.log_command(command);
    }
}

/// Get the flexjobs directory from environment or default
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FLEXJOBS_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory (set FLEXJOBS_DIR)")?;
    Ok(home.join(".flexjobs"))
}

/// Load configuration and build the migration context
pub fn get_context() -> Result<FlexJobsContext> {
    let app_dir = get_app_dir()?;

    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create flexjobs directory: {:?}", app_dir))?;

    FlexJobsContext::new(&app_dir).context("Failed to load flexjobs configuration")
}
