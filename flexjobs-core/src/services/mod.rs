//! Service layer - migration orchestration
//!
//! The ledger and executor are the building blocks; `MigrationManager`
//! composes them into a run. `LoggingService` records what happened.

pub mod executor;
pub mod ledger;
pub mod logging;
pub mod migration;

pub use executor::MigrationExecutor;
pub use ledger::{Ledger, LEDGER_TABLE};
pub use logging::{events, LogEntry, LogEvent, LogFilter, LogStats, LoggingService, RunSummary};
pub use migration::{MigrationManager, MigrationObserver, NoopObserver, RunState};
