//! Output sinks
//!
//! Writes a generated SQL script to a timestamped file or wraps it in a
//! versioned migration artifact.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::Result;

/// Join statements into a script, each ending in exactly one `;`
pub fn render_script(statements: &[String]) -> String {
    statements
        .iter()
        .map(|statement| format!("{};", statement.trim_end().trim_end_matches(';')))
        .collect::<Vec<_>>()
        .join("\n")
}

/// File name for a plain SQL dump of one sync run
pub fn sql_file_name(source: &str, target: &str, at: DateTime<Utc>) -> String {
    format!("{}_to_{}_{}.sql", source, target, at.format("%Y%m%d_%H%M%S"))
}

/// Write the script under `directory` and return the file path
pub fn write_sql_file(directory: impl AsRef<Path>, source: &str, target: &str, sql: &str) -> Result<PathBuf> {
    let directory = directory.as_ref();
    fs::create_dir_all(directory)?;

    let path = directory.join(sql_file_name(source, target, Utc::now()));
    fs::write(&path, format!("{}\n", sql))?;

    tracing::info!(path = %path.display(), "SQL written");
    Ok(path)
}

/// A versioned migration wrapping a generated script
#[derive(Debug, Clone)]
pub struct MigrationArtifact {
    pub version: String,
    pub checksum: String,
    pub sql: String,
}

impl MigrationArtifact {
    /// Build a migration stamped with the given time and id
    pub fn new(sql: &str, at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            version: format!("{}_schema_sync_{}", at.format("%Y_%m_%d_%H%M%S"), id),
            checksum: format!("{:x}", md5::compute(sql.as_bytes())),
            sql: sql.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.sql", self.version)
    }

    /// File contents: a header followed by the indented script
    pub fn contents(&self) -> String {
        let body: Vec<String> = self
            .sql
            .trim()
            .lines()
            .map(|line| format!("    {}", line))
            .collect();

        format!(
            "-- migration: {}\n-- checksum: {}\n-- up\n{}\n",
            self.version,
            self.checksum,
            body.join("\n")
        )
    }

    /// Write the artifact under `directory` and return the file path
    pub fn write_to(&self, directory: impl AsRef<Path>) -> Result<PathBuf> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;

        let path = directory.join(self.file_name());
        fs::write(&path, self.contents())?;

        tracing::info!(path = %path.display(), version = %self.version, "Migration written");
        Ok(path)
    }
}

/// Wrap the script in a freshly versioned migration and write it
pub fn write_migration(directory: impl AsRef<Path>, sql: &str) -> Result<PathBuf> {
    MigrationArtifact::new(sql, Utc::now(), Uuid::new_v4()).write_to(directory)
}
