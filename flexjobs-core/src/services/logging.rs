//! Event log - what each migration command did
//!
//! Events go to `logs.duckdb` in the app directory, never to the database
//! being migrated. Only metadata is recorded (command, migration filename,
//! batch, error text); SQL contents are never logged.
//!
//! The log's own schema is versioned by `MigrationManager` over the files in
//! `log_migrations`, so the runner bootstraps its own bookkeeping.

use std::path::{Path, PathBuf};

use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::open_connection;
use crate::adapters::embedded::EmbeddedSource;
use crate::config::DatabaseConfig;
use crate::domain::result::{Error, Result};
use crate::log_migrations::LOG_MIGRATIONS;
use crate::services::migration::MigrationManager;

pub const LOGS_DATABASE_FILE: &str = "logs.duckdb";

/// Event names written by the CLI
pub mod events {
    pub const COMMAND_EXECUTED: &str = "command_executed";
    pub const MIGRATION_APPLIED: &str = "migration_applied";
    pub const MIGRATE_COMPLETED: &str = "migrate_completed";
    pub const MIGRATE_FAILED: &str = "migrate_failed";
}

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            migration: None,
            batch: None,
            error_message: None,
            error_details: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Migration file the event is about
    pub fn with_migration(mut self, filename: impl Into<String>) -> Self {
        self.migration = Some(filename.into());
        self
    }

    pub fn with_batch(mut self, batch: i64) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Underlying database message, kept apart from the summary
    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: i64,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub migration: Option<String>,
    pub batch: Option<i64>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

impl LogEntry {
    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            app_version: row.get(2)?,
            platform: row.get(3)?,
            event: row.get(4)?,
            command: row.get(5)?,
            migration: row.get(6)?,
            batch: row.get(7)?,
            error_message: row.get(8)?,
            error_details: row.get(9)?,
        })
    }
}

/// Which events `LoggingService::query` returns
///
/// Every set field narrows the result; the default matches everything.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub errors_only: bool,
    /// Event names to keep (empty keeps all)
    pub events: Vec<String>,
    pub migration: Option<String>,
    pub batch: Option<i64>,
    pub limit: Option<usize>,
}

impl LogFilter {
    /// WHERE/LIMIT tail of the query plus its bound values
    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if self.errors_only {
            conditions.push("error_message IS NOT NULL".to_string());
        }
        if !self.events.is_empty() {
            let placeholders = vec!["?"; self.events.len()].join(", ");
            conditions.push(format!("event IN ({})", placeholders));
            values.extend(self.events.iter().cloned().map(Value::Text));
        }
        if let Some(migration) = &self.migration {
            conditions.push("migration = ?".to_string());
            values.push(Value::Text(migration.clone()));
        }
        if let Some(batch) = self.batch {
            conditions.push("batch = ?".to_string());
            values.push(Value::BigInt(batch));
        }

        let mut sql = String::new();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::BigInt(limit as i64));
        }
        (sql, values)
    }
}

/// One `migrate` invocation, read back from its closing event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub timestamp: i64,
    pub succeeded: bool,
    pub batch: Option<i64>,
    pub failed_migration: Option<String>,
    pub error: Option<String>,
}

impl From<LogEntry> for RunSummary {
    fn from(entry: LogEntry) -> Self {
        let succeeded = entry.event == events::MIGRATE_COMPLETED;
        Self {
            timestamp: entry.timestamp,
            succeeded,
            batch: entry.batch,
            failed_migration: if succeeded { None } else { entry.migration },
            error: entry.error_details.or(entry.error_message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LogStats {
    pub total: u64,
    pub errors: u64,
    /// Count per event name, sorted by name
    pub by_event: Vec<(String, u64)>,
}

/// Structured event log backed by its own DuckDB file
pub struct LoggingService {
    conn: Connection,
    db_path: PathBuf,
    app_version: String,
}

impl LoggingService {
    /// Bring `logs.duckdb` in `app_dir` up to date, then open it
    pub fn new(app_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let database = DatabaseConfig::new(app_dir.join(LOGS_DATABASE_FILE));

        let source = EmbeddedSource::new("embedded log migrations", LOG_MIGRATIONS.iter().copied());
        MigrationManager::new(database.clone(), source).run_pending()?;

        Ok(Self {
            conn: open_connection(&database)?,
            db_path: database.path,
            app_version: app_version.into(),
        })
    }

    /// Record an event, stamped with time, version and platform
    pub fn log(&self, event: LogEvent) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sys_logs (
                    timestamp, app_version, platform, event,
                    command, migration, batch, error_message, error_details
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    now_ms(),
                    &self.app_version,
                    std::env::consts::OS,
                    &event.event,
                    &event.command,
                    &event.migration,
                    &event.batch,
                    &event.error_message,
                    &event.error_details,
                ],
            )
            .map_err(log_error)?;
        Ok(())
    }

    /// Record that `command` was invoked
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(LogEvent::new(events::COMMAND_EXECUTED).with_command(command))
    }

    /// Matching entries, newest first
    pub fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let (tail, values) = filter.to_sql();
        let sql = format!(
            "SELECT id, timestamp, app_version, platform, event,
                    command, migration, batch, error_message, error_details
             FROM sys_logs{}",
            tail
        );

        let mut stmt = self.conn.prepare(&sql).map_err(log_error)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), LogEntry::from_row)
            .map_err(log_error)?;
        rows.collect::<duckdb::Result<Vec<_>>>().map_err(log_error)
    }

    /// Outcome of the most recent `migrate` runs, newest first
    pub fn runs(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let filter = LogFilter {
            events: vec![
                events::MIGRATE_COMPLETED.to_string(),
                events::MIGRATE_FAILED.to_string(),
            ],
            limit: Some(limit),
            ..LogFilter::default()
        };
        Ok(self.query(&filter)?.into_iter().map(RunSummary::from).collect())
    }

    pub fn stats(&self) -> Result<LogStats> {
        let (total, errors): (i64, i64) = self
            .conn
            .query_row(
                "SELECT COUNT(*), COUNT(error_message) FROM sys_logs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(log_error)?;

        let mut stmt = self
            .conn
            .prepare("SELECT event, COUNT(*) FROM sys_logs GROUP BY event ORDER BY event")
            .map_err(log_error)?;
        let by_event = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))
            .map_err(log_error)?
            .collect::<duckdb::Result<Vec<_>>>()
            .map_err(log_error)?;

        Ok(LogStats {
            total: total as u64,
            errors: errors as u64,
            by_event,
        })
    }

    /// Delete entries older than `timestamp_ms`, returning how many went
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let deleted = self
            .conn
            .execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])
            .map_err(log_error)?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn log_error(err: duckdb::Error) -> Error {
    Error::persistence(format!("event log: {}", err))
}
