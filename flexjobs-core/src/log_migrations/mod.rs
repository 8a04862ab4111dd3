//! Log database migrations - embedded SQL files
//!
//! Compiled into the binary with include_str! and applied by the same
//! migration manager that runs the application's own migrations.

/// All log migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// IMPORTANT: When adding a new migration:
/// 1. Create the SQL file: NNN_description.sql
/// 2. Add an entry here
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_sys_logs.sql",
        include_str!("001_create_sys_logs.sql"),
    ),
];
