//! Advisory lock serializing migration runs
//!
//! Two runs against the same database would compute the same pending set and
//! apply it twice. The lock file next to the database prevents that across
//! processes; it is released when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};

#[derive(Debug)]
pub struct MigrationLock {
    file: File,
    path: PathBuf,
}

impl MigrationLock {
    /// Take the lock without waiting; `Error::Locked` if another run holds it
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::connection(format!("cannot open lock file {}: {}", path.display(), e)))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(Error::Locked(path.to_path_buf()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.duckdb.migrate.lock");

        let guard = MigrationLock::acquire(&path).unwrap();
        assert_eq!(guard.path(), path.as_path());

        let second = MigrationLock::acquire(&path);
        assert!(matches!(second, Err(Error::Locked(p)) if p == path));
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.duckdb.migrate.lock");

        drop(MigrationLock::acquire(&path).unwrap());
        assert!(MigrationLock::acquire(&path).is_ok());
    }
}
