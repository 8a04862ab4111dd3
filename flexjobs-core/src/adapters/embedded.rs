//! In-memory migration source
//!
//! Used for migrations compiled into the binary (the logs database) and for
//! exercising the manager in tests without touching the filesystem.

use std::collections::BTreeMap;

use crate::domain::result::{Error, Result};
use crate::domain::MigrationFile;
use crate::ports::{filter_and_sort, MigrationSource};

#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    label: String,
    files: BTreeMap<String, String>,
}

impl EmbeddedSource {
    /// Build a source from `(filename, sql)` pairs
    pub fn new<I, N, S>(label: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            files: files
                .into_iter()
                .map(|(name, sql)| (name.into(), sql.into()))
                .collect(),
        }
    }
}

impl MigrationSource for EmbeddedSource {
    fn discover_all(&self) -> Result<Vec<String>> {
        Ok(filter_and_sort(self.files.keys().cloned()))
    }

    fn load(&self, filename: &str) -> Result<MigrationFile> {
        self.files
            .get(filename)
            .map(|sql| MigrationFile::new(filename, sql.clone()))
            .ok_or_else(|| Error::discovery(format!("{} not found in {}", filename, self.label)))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_does_not_matter() {
        let source = EmbeddedSource::new(
            "test",
            [
                ("C.sql", "SELECT 3"),
                ("A.sql", "SELECT 1"),
                ("seed.csv", "id\n1"),
                ("B.sql", "SELECT 2"),
            ],
        );

        assert_eq!(source.discover_all().unwrap(), vec!["A.sql", "B.sql", "C.sql"]);
        assert_eq!(source.load("B.sql").unwrap().sql, "SELECT 2");
    }

    #[test]
    fn test_unknown_file() {
        let source = EmbeddedSource::new("test", Vec::<(String, String)>::new());
        let err = source.load("missing.sql").unwrap_err();
        assert!(err.to_string().contains("missing.sql not found in test"));
    }
}
