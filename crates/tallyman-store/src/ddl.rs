//! Bookkeeping-table statements per SQL dialect

use crate::errors::Result;
use tallyman_core::config::validate_identifier;
use tallyman_core::{Configuration, Driver};

/// Name and storage options of the bookkeeping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub driver: Driver,
    pub name: String,
    pub charset: String,
    pub collate: String,
}

impl TableSpec {
    /// Build a spec, rejecting names that cannot be interpolated safely
    pub fn new(driver: Driver, name: &str, charset: &str, collate: &str) -> Result<Self> {
        validate_identifier("table name", name)?;
        validate_identifier("table charset", charset)?;
        validate_identifier("table collation", collate)?;
        Ok(Self {
            driver,
            name: name.to_string(),
            charset: charset.to_string(),
            collate: collate.to_string(),
        })
    }

    pub fn from_config(driver: Driver, config: &Configuration) -> Result<Self> {
        Self::new(
            driver,
            &config.table_name,
            &config.table_charset,
            &config.table_collate,
        )
    }

    fn quoted_name(&self) -> String {
        self.driver.quote_ident(&self.name)
    }

    /// `CREATE TABLE IF NOT EXISTS` for the bookkeeping table
    ///
    /// SQLite has neither table charsets nor the MySQL collations, so both are
    /// dropped there.
    pub fn create_table_sql(&self) -> String {
        let table = self.quoted_name();
        match self.driver {
            Driver::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 `version` CHAR(14) COLLATE {} NOT NULL, \
                 `executed_at` DATETIME NOT NULL\
                 ) ENGINE=InnoDB DEFAULT CHARSET={} COLLATE={}",
                table, self.collate, self.charset, self.collate
            ),
            Driver::Postgres => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 version CHAR(14) NOT NULL, \
                 executed_at TIMESTAMP NOT NULL)",
                table
            ),
            Driver::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 version CHAR(14) NOT NULL, \
                 executed_at DATETIME NOT NULL)",
                table
            ),
        }
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = match self.driver {
            Driver::Postgres => "$1, $2",
            Driver::MySql => "?, ?",
            Driver::Sqlite => "?1, ?2",
        };
        format!(
            "INSERT INTO {} (version, executed_at) VALUES ({})",
            self.quoted_name(),
            placeholders
        )
    }

    pub fn select_applied_sql(&self) -> String {
        let tiebreak = match self.driver {
            Driver::Sqlite => ", rowid ASC",
            Driver::MySql | Driver::Postgres => "",
        };
        format!(
            "SELECT version, executed_at FROM {} ORDER BY executed_at ASC{}",
            self.quoted_name(),
            tiebreak
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyman_core::errors::ExErrorKind;

    fn spec(driver: Driver) -> TableSpec {
        TableSpec::new(driver, "migration_versions", "utf8mb4", "utf8mb4_unicode_ci").unwrap()
    }

    #[test]
    fn test_mysql_ddl_carries_charset_and_collation() {
        let sql = spec(Driver::MySql).create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `migration_versions`"));
        assert!(sql.contains("`version` CHAR(14)"));
        assert!(sql.contains("`executed_at` DATETIME NOT NULL"));
        assert!(sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"));
    }

    #[test]
    fn test_sqlite_ddl_has_no_charset() {
        let sql = spec(Driver::Sqlite).create_table_sql();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"migration_versions\" (version CHAR(14) NOT NULL, executed_at DATETIME NOT NULL)"
        );
    }

    #[test]
    fn test_postgres_uses_timestamp() {
        let sql = spec(Driver::Postgres).create_table_sql();
        assert!(sql.contains("executed_at TIMESTAMP NOT NULL"));
        assert!(spec(Driver::Postgres).insert_sql().ends_with("VALUES ($1, $2)"));
    }

    #[test]
    fn test_select_orders_by_execution_time() {
        let sql = spec(Driver::Sqlite).select_applied_sql();
        assert!(sql.ends_with("ORDER BY executed_at ASC, rowid ASC"));
    }

    #[test]
    fn test_rejects_unsafe_names() {
        let err = TableSpec::new(Driver::Sqlite, "t\"; DROP", "utf8", "c").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Configuration);
        assert!(TableSpec::new(Driver::MySql, "t", "utf8 mb4", "c").is_err());
    }
}
