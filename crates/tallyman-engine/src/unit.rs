//! The migration unit contract and the statement helper units build on
//!
//! A unit gets the live connection and does whatever it needs with it. The
//! engine does not wrap a unit in a transaction, and a unit whose apply
//! succeeded may be run again if the bookkeeping write that follows fails.
//! Units must therefore be safe to re-run (`CREATE TABLE IF NOT EXISTS`,
//! guarded data fixes, ...).

use rusqlite::ffi::ErrorCode;
use rusqlite::Connection;
use tallyman_core::errors::{MigrationError, Result};

/// A single schema change
pub trait Migration {
    /// Apply the change using the live connection
    fn apply(&self, conn: &Connection) -> Result<()>;

    /// Short human-readable summary shown by `status`
    fn description(&self) -> Option<&str> {
        None
    }
}

/// Database status of one statement, in SQLSTATE form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatus {
    pub code: String,
    pub message: String,
}

impl SqlStatus {
    pub const SUCCESS: &'static str = "00000";
    pub const SUCCESS_WITH_WARNING: &'static str = "01000";
    pub const CONSTRAINT_VIOLATION: &'static str = "23000";
    pub const READ_ONLY: &'static str = "25006";
    pub const ACCESS_DENIED: &'static str = "42501";
    pub const SYNTAX_OR_ACCESS: &'static str = "42000";
    pub const GENERAL_ERROR: &'static str = "HY000";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS || self.code == Self::SUCCESS_WITH_WARNING
    }

    /// `Ok` for success codes, `MigrationExecution` with code and message otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(MigrationError::StatementFailed {
            code: self.code,
            message: self.message,
        }
        .into())
    }

    /// Classify a driver error
    pub fn from_error(err: &rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::ExecuteReturnedResults => {
                Self::new(Self::SUCCESS_WITH_WARNING, "statement returned rows")
            }
            rusqlite::Error::SqliteFailure(failure, message) => {
                let code = match failure.code {
                    ErrorCode::ConstraintViolation => Self::CONSTRAINT_VIOLATION,
                    ErrorCode::ReadOnly => Self::READ_ONLY,
                    ErrorCode::PermissionDenied | ErrorCode::AuthorizationForStatementDenied => {
                        Self::ACCESS_DENIED
                    }
                    // SQLITE_ERROR: syntax errors, missing tables and columns
                    ErrorCode::Unknown => Self::SYNTAX_OR_ACCESS,
                    _ => Self::GENERAL_ERROR,
                };
                let message = message.clone().unwrap_or_else(|| failure.to_string());
                Self::new(code, message)
            }
            other => Self::new(Self::GENERAL_ERROR, other.to_string()),
        }
    }
}

/// What a successful statement reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    /// Rows changed by a DML statement
    Affected(usize),
    /// The statement succeeded without a row count (warning status, or a batch)
    Completed,
}

/// Execute one statement
///
/// `00000` and `01000` count as success; a statement that produced rows is
/// reported as `01000` and yields `Completed`. Any other status fails with
/// `MigrationExecution` carrying the code and the driver message.
pub fn exec_sql(conn: &Connection, sql: &str) -> Result<StatementOutcome> {
    match conn.execute(sql, []) {
        Ok(affected) => Ok(StatementOutcome::Affected(affected)),
        Err(err) => {
            let status = SqlStatus::from_error(&err);
            tracing::debug!(code = %status.code, message = %status.message, "statement status");
            status.into_result().map(|_| StatementOutcome::Completed)
        }
    }
}

/// Execute a script of zero or more `;`-separated statements
pub fn exec_batch(conn: &Connection, sql: &str) -> Result<StatementOutcome> {
    match conn.execute_batch(sql) {
        Ok(()) => Ok(StatementOutcome::Completed),
        Err(err) => SqlStatus::from_error(&err)
            .into_result()
            .map(|_| StatementOutcome::Completed),
    }
}
