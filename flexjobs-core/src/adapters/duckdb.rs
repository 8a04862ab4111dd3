//! DuckDB connection handling

use std::thread;
use std::time::Duration;

use duckdb::Connection;

use crate::config::DatabaseConfig;
use crate::domain::result::{Error, Result};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("could not set lock on file")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Check if a database error is a uniqueness violation
pub fn is_unique_violation(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// Open a connection to the configured database
///
/// Retries with exponential backoff while another process holds the file,
/// then gives up with `Error::Connection`.
pub fn open_connection(config: &DatabaseConfig) -> Result<Connection> {
    let mut last_error = String::new();

    for attempt in 0..MAX_RETRIES {
        match try_open_connection(config) {
            Ok(conn) => return Ok(conn),
            Err(err_msg) => {
                if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[flexjobs] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        err_msg
                    );
                    thread::sleep(delay);
                    last_error = err_msg;
                    continue;
                }
                return Err(Error::connection(format!(
                    "cannot open {}: {}",
                    config.path.display(),
                    err_msg
                )));
            }
        }
    }

    Err(Error::connection(format!(
        "cannot open {} after {} attempts: {}",
        config.path.display(),
        MAX_RETRIES,
        last_error
    )))
}

fn try_open_connection(config: &DatabaseConfig) -> std::result::Result<Connection, String> {
    // Extension autoloading stays off: cached extensions may fail code signing
    let flags = duckdb::Config::default()
        .enable_autoload_extension(false)
        .map_err(|e| e.to_string())?;

    match &config.encryption_key {
        Some(key) => {
            // Encrypted database: open in-memory, then ATTACH the encrypted file
            let conn = Connection::open_in_memory_with_flags(flags).map_err(|e| e.to_string())?;
            load_crypto_extension(&conn)?;
            conn.execute_batch(&format!(
                "ATTACH '{}' AS main_db (ENCRYPTION_KEY '{}'); USE main_db;",
                escape_literal(&config.path.display().to_string()),
                escape_literal(key)
            ))
            .map_err(|e| e.to_string())?;
            Ok(conn)
        }
        None => Connection::open_with_flags(&config.path, flags).map_err(|e| e.to_string()),
    }
}

/// Load `httpfs`, which carries the crypto module DuckDB needs to write
/// encrypted files. Autoloading is off, so this has to be explicit.
fn load_crypto_extension(conn: &Connection) -> std::result::Result<(), String> {
    conn.execute_batch("LOAD httpfs;")
        .or_else(|_| conn.execute_batch("INSTALL httpfs; LOAD httpfs;"))
        .map_err(|e| format!("{}: {}", CRYPTO_EXTENSION_MISSING, e))
}

/// Prefix of the error returned when an encryption key is configured but
/// `httpfs` cannot be loaded
pub const CRYPTO_EXTENSION_MISSING: &str = "encrypted databases need the httpfs extension";

/// Version string of the DuckDB engine behind `conn`
pub fn engine_version(conn: &Connection) -> Result<String> {
    conn.query_row("SELECT version()", [], |row| row.get(0))
        .map_err(|e| Error::connection(format!("cannot query engine version: {}", e)))
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Check whether a table exists in the current database
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = ?",
        [table],
        |row| row.get(0),
    )
    .map_err(|e| Error::persistence(format!("cannot inspect schema: {}", e)))
}
