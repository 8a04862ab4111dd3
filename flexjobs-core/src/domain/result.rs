//! Result and error types for the core library

use std::path::PathBuf;

use thiserror::Error;

/// Core library error type
///
/// Every variant is fatal for a migration run. Nothing is retried apart
/// from the bounded retry when opening a busy database file.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Ledger initialization error: {0}")]
    LedgerInit(String),

    #[error("Migration {filename} failed: {message}")]
    MigrationExecution { filename: String, message: String },

    #[error("Cannot read migration {filename}: {message}")]
    MigrationLoad { filename: String, message: String },

    #[error("Migration {filename} is already recorded in the ledger")]
    DuplicateMigration { filename: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Another migration run holds the lock at {}", .0.display())]
    Locked(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Aborted after {completed} successful migration(s)")]
    Aborted {
        completed: usize,
        applied: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Wrap a failure that happened after `applied` migrations committed
    pub fn aborted(applied: Vec<String>, source: Error) -> Self {
        Self::Aborted {
            completed: applied.len(),
            applied,
            source: Box::new(source),
        }
    }

    /// Name of the migration file that caused the failure, if any
    pub fn failed_migration(&self) -> Option<&str> {
        match self {
            Self::MigrationExecution { filename, .. }
            | Self::MigrationLoad { filename, .. }
            | Self::DuplicateMigration { filename } => Some(filename),
            Self::Aborted { source, .. } => source.failed_migration(),
            _ => None,
        }
    }

    /// Number of migrations that committed before the run stopped
    pub fn completed(&self) -> usize {
        match self {
            Self::Aborted { completed, .. } => *completed,
            _ => 0,
        }
    }

    /// The innermost error, unwrapping any `Aborted` layer
    pub fn root(&self) -> &Error {
        match self {
            Self::Aborted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
