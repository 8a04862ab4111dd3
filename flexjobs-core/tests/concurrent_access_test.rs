//! Concurrent migration runs against one database
//!
//! Each thread builds its own manager, the way separate `flexjobs migrate`
//! processes would. The run lock must keep every migration applied exactly once.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::TempDir;

use flexjobs_core::adapters::duckdb::open_connection;
use flexjobs_core::adapters::{DirectorySource, MigrationLock};
use flexjobs_core::config::DatabaseConfig;
use flexjobs_core::services::{Ledger, MigrationManager};
use flexjobs_core::Error;

/// Number of concurrent runs
const THREAD_COUNT: usize = 4;

fn setup(temp_dir: &TempDir) -> (DatabaseConfig, std::path::PathBuf) {
    let migrations = temp_dir.path().join("migrations");
    std::fs::create_dir_all(&migrations).unwrap();
    std::fs::write(migrations.join("001_companies.sql"), "CREATE TABLE companies (id INTEGER);").unwrap();
    std::fs::write(migrations.join("002_jobs.sql"), "CREATE TABLE jobs (id INTEGER);").unwrap();
    std::fs::write(
        migrations.join("003_seed.sql"),
        "INSERT INTO companies VALUES (1); INSERT INTO jobs VALUES (10);",
    )
    .unwrap();
    (DatabaseConfig::new(temp_dir.path().join("flexjobs.duckdb")), migrations)
}

#[test]
fn test_concurrent_runs_apply_each_migration_once() {
    let temp_dir = TempDir::new().unwrap();
    let (database, migrations) = setup(&temp_dir);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let barrier = Arc::clone(&barrier);
        let database = database.clone();
        let migrations = migrations.clone();

        handles.push(thread::spawn(move || {
            let manager = MigrationManager::new(database, DirectorySource::new(migrations));
            barrier.wait();

            let result = manager.run_pending();
            match &result {
                Ok(report) => println!("Thread {}: applied {:?}", thread_id, report.applied),
                Err(e) => println!("Thread {}: {}", thread_id, e),
            }
            result
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let mut applied_total = 0;
    for result in &results {
        match result {
            Ok(report) => applied_total += report.applied.len(),
            Err(e) => assert!(matches!(e, Error::Locked(_)), "unexpected error: {e}"),
        }
    }
    assert_eq!(applied_total, 3, "each migration applied exactly once");

    let conn = open_connection(&database).unwrap();
    let ledger = Ledger::new(&conn);
    assert_eq!(
        ledger.list_applied().unwrap(),
        vec!["001_companies.sql", "002_jobs.sql", "003_seed.sql"]
    );
    let jobs: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0)).unwrap();
    assert_eq!(jobs, 1, "seed ran once");
}

#[test]
fn test_released_lock_lets_next_run_proceed() {
    let temp_dir = TempDir::new().unwrap();
    let (database, migrations) = setup(&temp_dir);
    let manager = MigrationManager::new(database.clone(), DirectorySource::new(migrations));

    let held = MigrationLock::acquire(&database.lock_path()).unwrap();
    let err = manager.run_pending().unwrap_err();
    assert!(matches!(err, Error::Locked(ref path) if path == &database.lock_path()));
    assert_eq!(err.completed(), 0);

    drop(held);
    let report = manager.run_pending().unwrap();
    assert_eq!(report.applied.len(), 3);
    assert_eq!(report.batch, Some(1));
}

#[test]
fn test_status_does_not_wait_for_lock() {
    let temp_dir = TempDir::new().unwrap();
    let (database, migrations) = setup(&temp_dir);
    let manager = MigrationManager::new(database.clone(), DirectorySource::new(migrations));

    let _held = MigrationLock::acquire(&database.lock_path()).unwrap();
    let status = manager.status().unwrap();

    assert_eq!(status.pending_count(), 3);
}
