//! Migration source port
//!
//! Defines where migration files come from. The manager only ever sees
//! filenames and opaque SQL text through this trait.

use crate::domain::result::Result;
use crate::domain::{MigrationFile, MIGRATION_EXTENSION};

/// Source of versioned migration files
///
/// Implementations must return names sorted lexicographically; that order
/// is the execution order. Nothing may be cached between calls.
pub trait MigrationSource {
    /// List every migration filename, in execution order
    fn discover_all(&self) -> Result<Vec<String>>;

    /// Load the SQL text for a discovered migration
    fn load(&self, filename: &str) -> Result<MigrationFile>;

    /// Human-readable location, shown by the CLI
    fn describe(&self) -> String;
}

/// Keep names with the migration extension and sort them lexicographically
pub fn filter_and_sort<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = names
        .into_iter()
        .map(Into::into)
        .filter(|name| name.ends_with(MIGRATION_EXTENSION) && name.len() > MIGRATION_EXTENSION.len())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_other_extensions() {
        let names = filter_and_sort(["002_jobs.sql", "README.md", "001_users.sql", "notes.sql.bak"]);
        assert_eq!(names, vec!["001_users.sql", "002_jobs.sql"]);
    }

    #[test]
    fn test_sort_is_plain_lexicographic() {
        // No numeric parsing: "10_" sorts before "9_"
        let names = filter_and_sort(["9_late.sql", "10_later.sql", "A.sql", "a.sql"]);
        assert_eq!(names, vec!["10_later.sql", "9_late.sql", "A.sql", "a.sql"]);
    }

    #[test]
    fn test_bare_extension_is_not_a_migration() {
        assert!(filter_and_sort([".sql"]).is_empty());
    }
}
