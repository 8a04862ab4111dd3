//! Migration entities

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// File extension recognized by discovery
pub const MIGRATION_EXTENSION: &str = ".sql";

/// A migration that has been applied and recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub filename: String,
    pub batch: i64,
    pub executed_at: NaiveDateTime,
}

/// A candidate migration loaded from its source
///
/// The SQL text is opaque: it is submitted to the database verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub filename: String,
    pub sql: String,
}

impl MigrationFile {
    pub fn new(filename: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            sql: sql.into(),
        }
    }
}

/// Outcome of a successful migration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Batch shared by the migrations applied in this run (None if nothing was pending)
    pub batch: Option<i64>,
    /// Names of newly applied migrations, in execution order
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Read-only view of applied vs pending migrations
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStatus {
    pub applied: Vec<MigrationRecord>,
    pub pending: Vec<String>,
}

impl MigrationStatus {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Result of `MigrationManager::check`
///
/// Produced without creating the ledger or taking the run lock.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub database: PathBuf,
    pub encrypted: bool,
    pub engine_version: String,
    pub ledger_present: bool,
    /// Rows in the ledger, zero when it does not exist yet
    pub applied: usize,
    pub pending: usize,
}

/// Filenames in `discovered` that are not in `applied`, keeping discovery order
pub fn compute_pending(discovered: &[String], applied: &[String]) -> Vec<String> {
    let applied: std::collections::HashSet<&str> = applied.iter().map(String::as_str).collect();
    discovered
        .iter()
        .filter(|name| !applied.contains(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pending_keeps_discovery_order() {
        let discovered = names(&["001_users.sql", "002_jobs.sql", "003_agents.sql"]);
        let applied = names(&["002_jobs.sql"]);

        assert_eq!(
            compute_pending(&discovered, &applied),
            names(&["001_users.sql", "003_agents.sql"])
        );
    }

    #[test]
    fn test_pending_ignores_applied_files_missing_on_disk() {
        let discovered = names(&["002_jobs.sql"]);
        let applied = names(&["001_removed.sql", "002_jobs.sql"]);

        assert!(compute_pending(&discovered, &applied).is_empty());
    }

    #[test]
    fn test_status_counts() {
        let status = MigrationStatus {
            applied: vec![],
            pending: names(&["a.sql", "b.sql"]),
        };
        assert_eq!(status.applied_count(), 0);
        assert_eq!(status.pending_count(), 2);
        assert!(!status.is_up_to_date());
    }
}
