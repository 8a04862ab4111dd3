//! Core domain entities
//!
//! Pure data structures describing migrations and their outcomes - no I/O.

mod migration;
pub mod result;

pub use migration::{
    compute_pending, HealthReport, MigrationFile, MigrationRecord, MigrationReport, MigrationStatus,
    MIGRATION_EXTENSION,
};
