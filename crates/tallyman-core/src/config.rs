//! Runner configuration
//!
//! Loaded from TOML (`tallyman.toml` by convention). Every field except
//! `database_url` has a default.

use crate::connection::ConnectionParams;
use crate::errors::{ExError, ExErrorKind, MigrationError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATE: &str = "utf8mb4_unicode_ci";
pub const DEFAULT_NAMESPACE: &str = "PdoMigrations";
pub const DEFAULT_TABLE_NAME: &str = "migration_versions";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    pub database_url: String,
    pub database_charset: String,
    pub table_name: String,
    pub table_charset: String,
    pub table_collate: String,
    /// Directory holding `Version<ts>.*` artifacts; `None` for registry-only setups
    pub migrations_path: Option<PathBuf>,
    pub migrations_namespace: String,
    /// Low-level driver options; applied as PRAGMAs by the SQLite backend
    pub driver_options: BTreeMap<String, String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_charset: DEFAULT_CHARSET.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            table_charset: DEFAULT_CHARSET.to_string(),
            table_collate: DEFAULT_COLLATE.to_string(),
            migrations_path: None,
            migrations_namespace: DEFAULT_NAMESPACE.to_string(),
            driver_options: default_driver_options(),
        }
    }
}

fn default_driver_options() -> BTreeMap<String, String> {
    BTreeMap::from([("foreign_keys".to_string(), "ON".to_string())])
}

impl Configuration {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ExError::new(ExErrorKind::Configuration)
                .with_op("load_configuration")
                .with_message(e.to_string())
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Configuration)
                .with_op("load_configuration")
                .with_message(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check everything that ends up interpolated into SQL
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(MigrationError::InvalidConfiguration {
                reason: "database_url is not set".to_string(),
            }
            .into());
        }
        validate_identifier("table name", &self.table_name)?;
        validate_identifier("database charset", &self.database_charset)?;
        validate_identifier("table charset", &self.table_charset)?;
        validate_identifier("table collation", &self.table_collate)?;
        validate_identifier("migrations namespace", &self.migrations_namespace)?;
        for key in self.driver_options.keys() {
            validate_identifier("driver option", key)?;
        }
        Ok(())
    }

    pub fn connection_params(&self) -> Result<ConnectionParams> {
        ConnectionParams::parse(&self.database_url, &self.database_charset)
    }
}

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_identifier(what: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(MigrationError::InvalidIdentifier {
            what: what.to_string(),
            value: value.to_string(),
        }
        .into())
    }
}
