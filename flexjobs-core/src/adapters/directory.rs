//! Filesystem migration source

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::domain::result::{Error, Result};
use crate::domain::MigrationFile;
use crate::ports::{filter_and_sort, MigrationSource};

/// Migrations stored as `*.sql` files in a single directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MigrationSource for DirectorySource {
    fn discover_all(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            // No migrations directory yet is a valid, empty state
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::discovery(format!(
                    "cannot read {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::discovery(format!("cannot read {}: {}", self.dir.display(), e))
            })?;
            if !entry.path().is_file() {
                continue;
            }
            // Non UTF-8 names cannot be recorded in the ledger
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }

        Ok(filter_and_sort(names))
    }

    fn load(&self, filename: &str) -> Result<MigrationFile> {
        let path = self.dir.join(filename);
        let sql = std::fs::read_to_string(&path)
            .map_err(|e| Error::discovery(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(MigrationFile::new(filename, sql))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let source = DirectorySource::new(dir.path().join("does-not-exist"));

        assert!(source.discover_all().unwrap().is_empty());
    }

    #[test]
    fn test_discovers_sorted_sql_files_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("C.sql"), "SELECT 3;").unwrap();
        std::fs::write(dir.path().join("A.sql"), "SELECT 1;").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a migration").unwrap();
        std::fs::write(dir.path().join("B.sql"), "SELECT 2;").unwrap();
        std::fs::create_dir(dir.path().join("archive.sql")).unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.discover_all().unwrap(), vec!["A.sql", "B.sql", "C.sql"]);
    }

    #[test]
    fn test_load_returns_verbatim_sql() {
        let dir = tempdir().unwrap();
        let sql = "CREATE TABLE jobs (id INTEGER);\nCREATE TABLE companies (id INTEGER);\n";
        std::fs::write(dir.path().join("001_init.sql"), sql).unwrap();

        let source = DirectorySource::new(dir.path());
        let file = source.load("001_init.sql").unwrap();
        assert_eq!(file.filename, "001_init.sql");
        assert_eq!(file.sql, sql);
    }

    #[test]
    fn test_load_missing_file_is_discovery_error() {
        let dir = tempdir().unwrap();
        let source = DirectorySource::new(dir.path());

        assert!(matches!(source.load("404.sql"), Err(Error::Discovery(_))));
    }
}
