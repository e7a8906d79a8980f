//! Database connection management
//!
//! Opens the single connection a run holds from parsed parameters. Only the
//! SQLite family has a compiled-in backend.

use crate::errors::{configuration, Result};
use rusqlite::Connection;
use std::collections::BTreeMap;
use tallyman_core::config::validate_identifier;
use tallyman_core::errors::{ExError, ExErrorKind, MigrationError};
use tallyman_core::{ConnectionParams, Driver};

pub const MEMORY_DATABASE: &str = ":memory:";

/// Open and configure a connection for the given parameters
pub fn open(params: &ConnectionParams, options: &BTreeMap<String, String>) -> Result<Connection> {
    match params.driver {
        Driver::Sqlite => {
            tracing::debug!(dsn = %params.dsn(), "opening sqlite database");
            let conn = if params.dbname == MEMORY_DATABASE {
                Connection::open_in_memory()
            } else {
                Connection::open(&params.dbname)
            }
            .map_err(|e| configuration("open_connection", e))?;
            configure(&conn, &params.charset, options)?;
            Ok(conn)
        }
        other => Err(MigrationError::UnsupportedDriver {
            scheme: format!("{} (no backend compiled in)", other),
        }
        .into()),
    }
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| configuration("open_connection", e))
}

/// Apply the character set and driver options to a fresh connection
pub fn configure(
    conn: &Connection,
    charset: &str,
    options: &BTreeMap<String, String>,
) -> Result<()> {
    conn.pragma_update(None, "encoding", sqlite_encoding(charset)?)
        .map_err(|e| configuration("configure_connection", e))?;

    for (key, value) in options {
        validate_identifier("driver option", key)?;
        conn.pragma_update(None, key, value)
            .map_err(|e| configuration("configure_connection", e))?;
    }

    Ok(())
}

fn sqlite_encoding(charset: &str) -> Result<&'static str> {
    let lower = charset.to_ascii_lowercase();
    if lower.starts_with("utf8") || lower == "utf-8" {
        Ok("UTF-8")
    } else if lower.starts_with("utf16") || lower == "utf-16" {
        Ok("UTF-16")
    } else {
        Err(ExError::new(ExErrorKind::Configuration)
            .with_op("configure_connection")
            .with_message(format!("charset {} is not supported by sqlite", charset)))
    }
}
