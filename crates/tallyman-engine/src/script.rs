//! `.sql` files as migration units

use crate::unit::{exec_batch, Migration};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tallyman_core::errors::{MigrationError, Result};
use tallyman_core::Version;

/// A migration read from `Version<ts>.sql`
#[derive(Debug, Clone)]
pub struct SqlScriptMigration {
    version: Version,
    path: PathBuf,
    sql: String,
    description: Option<String>,
}

impl SqlScriptMigration {
    /// Read the script at `path`
    ///
    /// A leading `-- ` comment line becomes the unit's description.
    pub fn load(version: Version, path: &Path) -> Result<Self> {
        let sql = std::fs::read_to_string(path).map_err(|e| MigrationError::InvalidUnit {
            version: version.to_string(),
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Ok(Self::from_sql(version, path.to_path_buf(), sql))
    }

    pub fn from_sql(version: Version, path: PathBuf, sql: String) -> Self {
        let description = sql
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("--"))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Self {
            version,
            path,
            sql,
            description,
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Migration for SqlScriptMigration {
    fn apply(&self, conn: &Connection) -> Result<()> {
        if self.sql.trim().is_empty() {
            tracing::warn!(
                version = %self.version,
                path = %self.path.display(),
                "empty migration script"
            );
            return Ok(());
        }
        exec_batch(conn, &self.sql).map(|_| ())
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
