//! Store-specific error constructors
//!
//! Every database failure is folded into the canonical `ExError` with the
//! kind the calling operation is documented to raise.

use tallyman_core::errors::{ExError, ExErrorKind};

pub use tallyman_core::errors::Result;

/// Connectivity or DDL failure
pub fn configuration(op: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// The bookkeeping insert failed
pub fn record_failed(version: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("record_applied")
        .with_version(version)
        .with_message(format!("could not record migration {}: {}", version, err))
}

/// A bookkeeping row that does not hold a valid version or timestamp
pub fn corrupt_row(table: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("list_applied")
        .with_message(format!("corrupt row in {}: {}", table, reason))
}
