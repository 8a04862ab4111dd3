//! Migration executor - applies one migration with all-or-nothing semantics
//!
//! The SQL text and the ledger insert share one transaction, so a migration
//! appears in the ledger iff its SQL committed.

use duckdb::Connection;

use crate::domain::result::{Error, Result};
use crate::domain::MigrationFile;
use crate::services::ledger::Ledger;

pub struct MigrationExecutor<'a> {
    conn: &'a mut Connection,
}

impl<'a> MigrationExecutor<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Run `file` and record it under `batch`, rolling back on any failure
    ///
    /// Every early return drops `tx`, and a dropped transaction rolls back.
    pub fn execute(&mut self, file: &MigrationFile, batch: i64) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| execution_error(&file.filename, e))?;

        tx.execute_batch(&file.sql)
            .map_err(|e| execution_error(&file.filename, e))?;
        Ledger::new(&tx).record(&file.filename, batch)?;

        tx.commit().map_err(|e| execution_error(&file.filename, e))
    }
}

fn execution_error(filename: &str, err: duckdb::Error) -> Error {
    Error::MigrationExecution {
        filename: filename.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::table_exists;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        Ledger::new(&conn).ensure_exists().unwrap();
        conn
    }

    #[test]
    fn test_success_commits_sql_and_record() {
        let mut conn = setup();
        let file = MigrationFile::new(
            "001_init.sql",
            "CREATE TABLE companies (id INTEGER, name VARCHAR);
             CREATE TABLE jobs (id INTEGER, company_id INTEGER, title VARCHAR);",
        );

        MigrationExecutor::new(&mut conn).execute(&file, 1).unwrap();

        assert!(table_exists(&conn, "companies").unwrap());
        assert!(table_exists(&conn, "jobs").unwrap());
        assert_eq!(Ledger::new(&conn).list_applied().unwrap(), vec!["001_init.sql"]);
    }

    #[test]
    fn test_failure_rolls_back_earlier_statements() {
        let mut conn = setup();
        let file = MigrationFile::new(
            "002_broken.sql",
            "CREATE TABLE saved_jobs (id INTEGER);
             CREATE TABL applications (id INTEGER);",
        );

        let err = MigrationExecutor::new(&mut conn).execute(&file, 1).unwrap_err();

        assert!(matches!(err, Error::MigrationExecution { ref filename, .. } if filename == "002_broken.sql"));
        assert!(!table_exists(&conn, "saved_jobs").unwrap());
        assert!(Ledger::new(&conn).list_applied().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_record_rolls_back_sql() {
        let mut conn = setup();
        Ledger::new(&conn).record("003_agents.sql", 1).unwrap();

        let file = MigrationFile::new("003_agents.sql", "CREATE TABLE agents (id INTEGER);");
        let err = MigrationExecutor::new(&mut conn).execute(&file, 2).unwrap_err();

        assert!(matches!(err, Error::DuplicateMigration { .. }));
        assert!(!table_exists(&conn, "agents").unwrap());
    }

    #[test]
    fn test_connection_usable_after_failure() {
        let mut conn = setup();
        let bad = MigrationFile::new("a.sql", "SELECT * FROM nowhere;");
        let good = MigrationFile::new("b.sql", "CREATE TABLE categories (id INTEGER);");

        assert!(MigrationExecutor::new(&mut conn).execute(&bad, 1).is_err());
        MigrationExecutor::new(&mut conn).execute(&good, 1).unwrap();

        assert_eq!(Ledger::new(&conn).list_applied().unwrap(), vec!["b.sql"]);
    }
}
