//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The migration
//! services depend only on these traits, not on concrete implementations.

mod migration_source;

pub use migration_source::{filter_and_sort, MigrationSource};
