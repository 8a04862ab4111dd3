//! New command - scaffold a migration file

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dialoguer::Input;
use regex::Regex;

use super::{get_context, get_logger, log_command};
use crate::output;

/// Lowercase the name and collapse every run of other characters into `_`
pub fn slugify(name: &str) -> Result<String> {
    let re = Regex::new(r"[^a-z0-9]+")?;
    let slug = re.replace_all(&name.to_lowercase(), "_").trim_matches('_').to_string();
    if slug.is_empty() {
        anyhow::bail!("Migration name '{}' has no letters or digits", name);
    }
    Ok(slug)
}

/// `<UTC timestamp>_<slug>.sql`, so lexical order follows creation order
pub fn migration_filename(name: &str, now: DateTime<Utc>) -> Result<String> {
    Ok(format!("{}_{}.sql", now.format("%Y%m%d%H%M%S"), slugify(name)?))
}

/// Create the file, refusing to overwrite an existing one
fn create_migration_file(dir: &Path, filename: &str, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create migrations directory: {:?}", dir))?;

    let path = dir.join(filename);
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            anyhow::bail!("Migration already exists: {}", path.display())
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to create {:?}", path)),
    };
    writeln!(file, "-- {}", name)?;
    writeln!(file)?;
    Ok(path)
}

pub fn run(name: Option<String>, json: bool) -> Result<()> {
    let logger = get_logger();
    log_command(&logger, "new");

    let ctx = get_context()?;

    let name = match name {
        Some(n) => n,
        None => Input::new()
            .with_prompt("Migration name")
            .interact_text()?,
    };

    let filename = migration_filename(&name, Utc::now())?;
    let path = create_migration_file(&ctx.config.migrations_dir, &filename, &name)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "filename": filename,
                "path": path.to_string_lossy(),
            }))?
        );
    } else {
        output::success(&format!("Created {}", path.display()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add remote policy").unwrap(), "add_remote_policy");
        assert_eq!(slugify("  jobs--Salary Range!! ").unwrap(), "jobs_salary_range");
        assert_eq!(slugify("v2 agents").unwrap(), "v2_agents");
        assert!(slugify("!!!").is_err());
    }

    #[test]
    fn test_filename_sorts_by_creation_time() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 9, 8, 5, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 10, 17, 14, 30, 2).unwrap();

        let first = migration_filename("zebra", earlier).unwrap();
        let second = migration_filename("apple", later).unwrap();

        assert_eq!(first, "20260309080500_zebra.sql");
        assert_eq!(second, "20261017143002_apple.sql");
        assert!(first < second);
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let migrations = dir.path().join("migrations");

        let path = create_migration_file(&migrations, "001_jobs.sql", "jobs").unwrap();
        assert!(path.exists());
        std::fs::write(&path, "CREATE TABLE jobs (id INTEGER);").unwrap();

        let err = create_migration_file(&migrations, "001_jobs.sql", "jobs").unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "CREATE TABLE jobs (id INTEGER);"
        );
    }
}
