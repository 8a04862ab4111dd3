//! Adapter implementations
//!
//! Adapters implement the ports with concrete technologies:
//! - Local filesystem directory for MigrationSource
//! - Compile-time file list for MigrationSource (logs database, tests)
//! - DuckDB connection handling
//! - fs2 advisory lock for serializing runs

pub mod directory;
pub mod duckdb;
pub mod embedded;
pub mod lock;

pub use directory::DirectorySource;
pub use embedded::EmbeddedSource;
pub use lock::MigrationLock;
