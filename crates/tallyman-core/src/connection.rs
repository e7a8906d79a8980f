//! Connection-string parsing
//!
//! Turns `scheme://[user[:pass]@]host[:port]/dbname` into the parameters a
//! driver needs. Parsing is driver-agnostic; whether a backend exists for
//! the driver family is decided when the connection is opened.

use crate::errors::{MigrationError, Result};
use std::fmt;
use tallyman_core_types::Sensitive;
use url::Url;

/// Database driver family selected by the URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
    MySql,
    Postgres,
}

impl Driver {
    pub fn from_scheme(scheme: &str) -> Result<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "postgres" | "postgresql" | "pgsql" => Ok(Driver::Postgres),
            other => Err(MigrationError::UnsupportedDriver {
                scheme: other.to_string(),
            }
            .into()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::MySql => "mysql",
            Driver::Postgres => "pgsql",
        }
    }

    /// Quote an identifier that has already passed `validate_identifier`
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Driver::MySql => format!("`{}`", ident),
            Driver::Sqlite | Driver::Postgres => format!("\"{}\"", ident),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed connection parameters
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub driver: Driver,
    pub host: String,
    pub port: Option<u16>,
    pub dbname: String,
    pub user: Option<String>,
    pub password: Option<Sensitive<String>>,
    pub charset: String,
}

impl ConnectionParams {
    /// Parse a database URL, appending the configured character set
    ///
    /// The server address is checked before the database name, so a URL
    /// missing both reports the missing address.
    pub fn parse(database_url: &str, charset: &str) -> Result<Self> {
        let url = Url::parse(database_url).map_err(|e| MigrationError::InvalidUrl {
            reason: e.to_string(),
        })?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(MigrationError::MissingServerAddress)?
            .to_string();

        // One leading slash separates the authority; a second one survives so
        // file-backed drivers can take absolute paths.
        let path = url.path();
        let dbname = path
            .strip_prefix('/')
            .unwrap_or(path)
            .trim_end_matches('/')
            .to_string();
        if dbname.is_empty() {
            return Err(MigrationError::MissingDatabaseName.into());
        }

        let driver = Driver::from_scheme(url.scheme())?;

        let user = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let password = url
            .password()
            .filter(|p| !p.is_empty())
            .map(|p| Sensitive::new(p.to_string()));

        Ok(Self {
            driver,
            host,
            port: url.port(),
            dbname,
            user,
            password,
            charset: charset.to_string(),
        })
    }

    /// Driver-style DSN without credentials, e.g.
    /// `mysql:host=db;port=3306;dbname=app;charset=utf8mb4;`
    pub fn dsn(&self) -> String {
        let mut dsn = format!("{}:host={};", self.driver.name(), self.host);
        if let Some(port) = self.port {
            dsn.push_str(&format!("port={};", port));
        }
        dsn.push_str(&format!("dbname={};charset={};", self.dbname, self.charset));
        dsn
    }
}
