//! FlexJobs Core - schema migrations for the FlexJobs database
//!
//! Versioned `.sql` files are applied in lexicographic order, each in its own
//! transaction, and recorded in a `schema_migrations` ledger inside the
//! target database. The crate follows a hexagonal layout:
//!
//! - **domain**: migration records, reports and the error taxonomy
//! - **ports**: the `MigrationSource` trait
//! - **services**: ledger, executor, orchestrating manager, event logging
//! - **adapters**: DuckDB, filesystem and embedded sources, run lock

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;

use adapters::DirectorySource;
use config::Config;
use services::MigrationManager;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{HealthReport, MigrationFile, MigrationRecord, MigrationReport, MigrationStatus};
pub use services::{LogEntry, LogEvent, LogFilter, LoggingService, MigrationObserver, RunState};

/// Main context for migration commands
///
/// Holds the resolved configuration and a manager wired to the configured
/// database and migrations directory.
pub struct FlexJobsContext {
    pub config: Config,
    pub manager: MigrationManager<DirectorySource>,
}

impl FlexJobsContext {
    /// Load configuration from `app_dir` and build the manager
    pub fn new(app_dir: &Path) -> Result<Self> {
        let config = Config::load(app_dir)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        let manager = MigrationManager::new(
            config.database.clone(),
            DirectorySource::new(config.migrations_dir.clone()),
        );
        Self { config, manager }
    }
}
