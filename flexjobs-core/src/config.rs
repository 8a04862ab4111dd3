//! Configuration management
//!
//! Settings live in `settings.json` inside the app directory:
//! ```json
//! {
//!   "database": { "path": "flexjobs.duckdb", "encryptionKey": null },
//!   "migrations": { "directory": "migrations" }
//! }
//! ```
//!
//! Environment variables override the file, so deploy scripts can point the
//! runner at another database without editing settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DATABASE_FILE: &str = "flexjobs.duckdb";
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(default)]
    migrations: MigrationSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    encryption_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrationSettings {
    #[serde(default)]
    directory: Option<String>,
}

/// Connection parameters for the target database
///
/// Opaque to the migration services: they only hand it to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub encryption_key: Option<String>,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encryption_key: None,
        }
    }

    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// Advisory lock file guarding migration runs against this database
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".migrate.lock");
        PathBuf::from(name)
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub migrations_dir: PathBuf,
}

impl Config {
    /// Load config from the app directory, applying process environment overrides
    ///
    /// Recognized variables, highest priority first:
    /// - `FLEXJOBS_DB_PATH`, then `DB_NAME` (database file)
    /// - `FLEXJOBS_DB_KEY` (encryption key)
    /// - `FLEXJOBS_MIGRATIONS_DIR`
    ///
    /// `DB_PASSWORD` is a server login in `.env` files written for networked
    /// databases and is not read as an encryption key.
    pub fn load(app_dir: &Path) -> Result<Self> {
        Self::load_with_env(app_dir, |key| std::env::var(key).ok())
    }

    /// Load config using an explicit environment lookup
    pub fn load_with_env<F>(app_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = app_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let db_path = non_empty("FLEXJOBS_DB_PATH")
            .or_else(|| non_empty("DB_NAME").map(database_file_name))
            .or(raw.database.path)
            .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string());

        let encryption_key = non_empty("FLEXJOBS_DB_KEY")
            .or(raw.database.encryption_key);

        let migrations_dir = non_empty("FLEXJOBS_MIGRATIONS_DIR")
            .or(raw.migrations.directory)
            .unwrap_or_else(|| DEFAULT_MIGRATIONS_DIR.to_string());

        Ok(Self {
            database: DatabaseConfig {
                path: resolve(app_dir, &db_path),
                encryption_key,
            },
            migrations_dir: resolve(app_dir, &migrations_dir),
        })
    }
}

/// `DB_NAME` names a database, not a file: give it the DuckDB extension
fn database_file_name(name: String) -> String {
    if Path::new(&name).extension().is_some() {
        name
    } else {
        format!("{}.duckdb", name)
    }
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
