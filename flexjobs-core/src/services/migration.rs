//! Migration service - brings a database up to date with its migration files
//!
//! One `run_pending` call is one invocation of the state machine:
//!
//! ```text
//! Idle -> Connecting -> LedgerReady -> Diffing -> Executing(i)... -> Done
//!            \______________\______________\__________\_______-> Aborted
//! ```
//!
//! Each migration commits in its own transaction, so a failure keeps the
//! migrations before it and a re-run resumes at the failed file.

use serde::Serialize;

use crate::adapters::duckdb::{engine_version, open_connection, table_exists};
use crate::adapters::lock::MigrationLock;
use crate::config::DatabaseConfig;
use crate::domain::result::{Error, Result};
use crate::domain::{compute_pending, HealthReport, MigrationReport, MigrationStatus};
use crate::ports::MigrationSource;
use crate::services::executor::MigrationExecutor;
use crate::services::ledger::{Ledger, LEDGER_TABLE};

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Connecting,
    LedgerReady,
    Diffing,
    /// Applying the pending migration at this index
    Executing(usize),
    Done,
    Aborted,
}

/// Receives progress notifications while a run advances
///
/// All methods default to no-ops.
pub trait MigrationObserver {
    fn on_state(&mut self, _state: RunState) {}

    /// Called once with the pending set, before anything is executed
    fn on_pending(&mut self, _pending: &[String], _batch: i64) {}

    fn on_applied(&mut self, _filename: &str) {}

    fn on_failed(&mut self, _filename: &str, _error: &Error) {}
}

/// Observer that ignores every notification
pub struct NoopObserver;

impl MigrationObserver for NoopObserver {}

/// Service for applying and inspecting migrations against one database
pub struct MigrationManager<S: MigrationSource> {
    database: DatabaseConfig,
    source: S,
}

impl<S: MigrationSource> MigrationManager<S> {
    pub fn new(database: DatabaseConfig, source: S) -> Self {
        Self { database, source }
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run all pending migrations
    pub fn run_pending(&self) -> Result<MigrationReport> {
        self.run_pending_with(&mut NoopObserver)
    }

    /// Run all pending migrations, reporting progress to `observer`
    ///
    /// The connection and the run lock are released on every exit path.
    pub fn run_pending_with(&self, observer: &mut dyn MigrationObserver) -> Result<MigrationReport> {
        observer.on_state(RunState::Idle);
        let result = self.apply(observer);
        observer.on_state(if result.is_ok() {
            RunState::Done
        } else {
            RunState::Aborted
        });
        result
    }

    fn apply(&self, observer: &mut dyn MigrationObserver) -> Result<MigrationReport> {
        let _lock = MigrationLock::acquire(&self.database.lock_path())?;

        observer.on_state(RunState::Connecting);
        let mut conn = open_connection(&self.database)?;

        let (pending, already_applied, batch) = {
            let ledger = Ledger::new(&conn);
            ledger.ensure_exists()?;
            observer.on_state(RunState::LedgerReady);

            observer.on_state(RunState::Diffing);
            let discovered = self.source.discover_all()?;
            let applied = ledger.list_applied()?;
            let pending = compute_pending(&discovered, &applied);

            if pending.is_empty() {
                return Ok(MigrationReport {
                    batch: None,
                    applied: Vec::new(),
                    already_applied: applied.len(),
                });
            }

            // One batch for the whole run, fixed before anything executes
            let batch = ledger.next_batch()?;
            (pending, applied.len(), batch)
        };
        observer.on_pending(&pending, batch);

        let mut newly_applied = Vec::with_capacity(pending.len());
        for (index, filename) in pending.iter().enumerate() {
            observer.on_state(RunState::Executing(index));

            let outcome = self
                .source
                .load(filename)
                .map_err(|e| Error::MigrationLoad {
                    filename: filename.clone(),
                    message: e.to_string(),
                })
                .and_then(|file| MigrationExecutor::new(&mut conn).execute(&file, batch));

            if let Err(e) = outcome {
                observer.on_failed(filename, &e);
                return Err(Error::aborted(newly_applied, e));
            }

            observer.on_applied(filename);
            newly_applied.push(filename.clone());
        }

        Ok(MigrationReport {
            batch: Some(batch),
            applied: newly_applied,
            already_applied,
        })
    }

    /// Report applied and pending migrations without executing anything
    pub fn status(&self) -> Result<MigrationStatus> {
        let conn = open_connection(&self.database)?;
        let ledger = Ledger::new(&conn);
        ledger.ensure_exists()?;

        let applied = ledger.records()?;
        let applied_names: Vec<String> = applied.iter().map(|r| r.filename.clone()).collect();
        let pending = compute_pending(&self.source.discover_all()?, &applied_names);

        Ok(MigrationStatus { applied, pending })
    }

    /// Connect and describe the database without changing it
    pub fn check(&self) -> Result<HealthReport> {
        let conn = open_connection(&self.database)?;
        let engine_version = engine_version(&conn)?;

        let ledger_present = table_exists(&conn, LEDGER_TABLE)?;
        let applied = if ledger_present {
            Ledger::new(&conn).list_applied()?
        } else {
            Vec::new()
        };
        let pending = compute_pending(&self.source.discover_all()?, &applied);

        Ok(HealthReport {
            database: self.database.path.clone(),
            encrypted: self.database.encryption_key.is_some(),
            engine_version,
            ledger_present,
            applied: applied.len(),
            pending: pending.len(),
        })
    }
}
