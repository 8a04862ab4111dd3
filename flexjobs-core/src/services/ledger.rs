//! Migration ledger - the `schema_migrations` table
//!
//! The ledger lives inside the target database so every process pointed at
//! the same database sees the same history. Rows are insert-only.

use chrono::NaiveDateTime;
use duckdb::{params, Connection};

use crate::adapters::duckdb::is_unique_violation;
use crate::domain::result::{Error, Result};
use crate::domain::MigrationRecord;

pub const LEDGER_TABLE: &str = "schema_migrations";

const CREATE_LEDGER_SQL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS schema_migrations_id_seq START 1;
CREATE TABLE IF NOT EXISTS schema_migrations (
    id INTEGER PRIMARY KEY DEFAULT nextval('schema_migrations_id_seq'),
    filename VARCHAR NOT NULL UNIQUE,
    batch INTEGER NOT NULL,
    executed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Ledger operations over an open connection (or transaction)
pub struct Ledger<'a> {
    conn: &'a Connection,
}

impl<'a> Ledger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create the ledger table if it does not exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_LEDGER_SQL)
            .map_err(|e| Error::LedgerInit(e.to_string()))
    }

    /// Filenames of applied migrations, in execution order
    pub fn list_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT filename FROM schema_migrations ORDER BY executed_at, id")
            .map_err(|e| Error::persistence(format!("cannot read ledger: {}", e)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::persistence(format!("cannot read ledger: {}", e)))?;

        let mut result = Vec::new();
        for name in names {
            result.push(name.map_err(|e| Error::persistence(format!("cannot read ledger row: {}", e)))?);
        }
        Ok(result)
    }

    /// Full ledger rows, in execution order
    pub fn records(&self) -> Result<Vec<MigrationRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT CAST(id AS BIGINT), filename, CAST(batch AS BIGINT), executed_at::VARCHAR
                 FROM schema_migrations
                 ORDER BY executed_at, id",
            )
            .map_err(|e| Error::persistence(format!("cannot read ledger: {}", e)))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| Error::persistence(format!("cannot read ledger: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, filename, batch, executed_at) =
                row.map_err(|e| Error::persistence(format!("cannot read ledger row: {}", e)))?;
            records.push(MigrationRecord {
                id,
                filename,
                batch,
                executed_at: parse_timestamp(&executed_at)?,
            });
        }
        Ok(records)
    }

    /// Batch number for the next run: max(batch) + 1, or 1 on an empty ledger
    pub fn next_batch(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT CAST(COALESCE(MAX(batch), 0) + 1 AS BIGINT) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::persistence(format!("cannot compute next batch: {}", e)))
    }

    /// Insert one immutable record
    ///
    /// The UNIQUE constraint on `filename` decides duplicates.
    pub fn record(&self, filename: &str, batch: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO schema_migrations (filename, batch) VALUES (?, ?)",
                params![filename, batch],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicateMigration {
                        filename: filename.to_string(),
                    }
                } else {
                    Error::persistence(format!("cannot record {}: {}", filename, e))
                }
            })?;
        Ok(())
    }
}

/// Parse DuckDB's `TIMESTAMP::VARCHAR` output ("YYYY-MM-DD HH:MM:SS[.ffffff]")
fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| Error::persistence(format!("invalid executed_at '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::table_exists;

    fn ledger_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        Ledger::new(&conn).ensure_exists().unwrap();
        conn
    }

    #[test]
    fn test_ensure_exists_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::new(&conn);

        ledger.ensure_exists().unwrap();
        ledger.record("001_init.sql", 1).unwrap();
        ledger.ensure_exists().unwrap();

        assert!(table_exists(&conn, LEDGER_TABLE).unwrap());
        assert_eq!(ledger.list_applied().unwrap(), vec!["001_init.sql"]);
    }

    #[test]
    fn test_next_batch_starts_at_one() {
        let conn = ledger_conn();
        let ledger = Ledger::new(&conn);

        assert_eq!(ledger.next_batch().unwrap(), 1);

        ledger.record("001_init.sql", 1).unwrap();
        ledger.record("002_jobs.sql", 1).unwrap();
        assert_eq!(ledger.next_batch().unwrap(), 2);

        ledger.record("003_agents.sql", 4).unwrap();
        assert_eq!(ledger.next_batch().unwrap(), 5);
    }

    #[test]
    fn test_duplicate_record_is_rejected() {
        let conn = ledger_conn();
        let ledger = Ledger::new(&conn);

        ledger.record("001_init.sql", 1).unwrap();
        let err = ledger.record("001_init.sql", 2).unwrap_err();

        assert!(matches!(err, Error::DuplicateMigration { ref filename } if filename == "001_init.sql"));
        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_records_in_execution_order() {
        let conn = ledger_conn();
        let ledger = Ledger::new(&conn);

        // Insertion order, not name order, is execution order
        ledger.record("b.sql", 1).unwrap();
        ledger.record("a.sql", 2).unwrap();

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, "b.sql");
        assert_eq!(records[0].batch, 1);
        assert_eq!(records[1].filename, "a.sql");
        assert_eq!(records[1].batch, 2);
        assert!(records[0].id < records[1].id);
        assert_eq!(ledger.list_applied().unwrap(), vec!["b.sql", "a.sql"]);
    }

    #[test]
    fn test_reads_fail_without_ledger() {
        let conn = Connection::open_in_memory().unwrap();
        let ledger = Ledger::new(&conn);

        assert!(matches!(ledger.list_applied(), Err(Error::Persistence(_))));
        assert!(matches!(ledger.next_batch(), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let with_fraction = parse_timestamp("2026-10-17 09:15:42.123456").unwrap();
        let without = parse_timestamp("2026-10-17 09:15:42").unwrap();
        assert_eq!(with_fraction.format("%H:%M:%S").to_string(), "09:15:42");
        assert_eq!(without.format("%Y-%m-%d").to_string(), "2026-10-17");
        assert!(parse_timestamp("yesterday").is_err());
    }
}
