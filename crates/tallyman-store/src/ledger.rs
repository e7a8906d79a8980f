//! Applied-version store
//!
//! Owns the bookkeeping table: creates it on demand, lists the versions that
//! ran, and records a version right after its apply succeeds. No other code
//! writes to the table.
//!
//! The table has no uniqueness constraint on `version`, matching bookkeeping
//! tables created by earlier runners. Recording the same version twice leaves
//! two rows; `list_applied` returns both.

#![allow(clippy::result_large_err)]

use crate::ddl::TableSpec;
use crate::errors::{configuration, corrupt_row, record_failed, Result};
use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use tallyman_core::Version;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// One bookkeeping row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: Version,
    pub executed_at: NaiveDateTime,
}

pub struct AppliedVersionStore<'conn> {
    conn: &'conn Connection,
    table: TableSpec,
}

impl<'conn> AppliedVersionStore<'conn> {
    pub fn new(conn: &'conn Connection, table: TableSpec) -> Self {
        Self { conn, table }
    }

    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    /// Create the bookkeeping table if it does not exist yet
    pub fn ensure_initialized(&self) -> Result<()> {
        self.conn
            .execute_batch(&self.table.create_table_sql())
            .map_err(|e| configuration("ensure_initialized", e))?;
        tracing::debug!(table = %self.table.name, "bookkeeping table ready");
        Ok(())
    }

    /// Recorded versions ordered by execution time
    pub fn list_applied(&self) -> Result<Vec<Version>> {
        Ok(self
            .list_records()?
            .into_iter()
            .map(|record| record.version)
            .collect())
    }

    /// Recorded rows ordered by execution time, then insertion order
    pub fn list_records(&self) -> Result<Vec<AppliedMigration>> {
        let mut stmt = self
            .conn
            .prepare(&self.table.select_applied_sql())
            .map_err(|e| configuration("list_applied", e))?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| configuration("list_applied", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| configuration("list_applied", e))?;

        rows.into_iter()
            .map(|(version, executed_at)| {
                // CHAR columns may come back space-padded on some engines
                let version = Version::parse(version.trim())
                    .map_err(|e| corrupt_row(&self.table.name, e.message()))?;
                let executed_at = parse_timestamp(&executed_at)
                    .ok_or_else(|| corrupt_row(&self.table.name, &executed_at))?;
                Ok(AppliedMigration {
                    version,
                    executed_at,
                })
            })
            .collect()
    }

    /// Insert one row for `version`, stamped with the current UTC time
    pub fn record_applied(&self, version: &Version) -> Result<AppliedMigration> {
        let executed_at = Utc::now().naive_utc();
        self.conn
            .execute(
                &self.table.insert_sql(),
                rusqlite::params![
                    version.as_str(),
                    executed_at.format(TIMESTAMP_FORMAT).to_string()
                ],
            )
            .map_err(|e| record_failed(version.as_str(), e))?;

        Ok(AppliedMigration {
            version: version.clone(),
            executed_at,
        })
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}
