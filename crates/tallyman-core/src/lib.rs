//! tallyman core - shared vocabulary of the migration runner
//!
//! This crate provides:
//! - The structured error facility (`ExError`, `ExErrorKind`, `MigrationError`)
//! - The logging facility (profiles, op macros, test capture)
//! - Migration version identifiers
//! - Runner configuration and connection-string parsing

pub mod config;
pub mod connection;
pub mod errors;
pub mod logging_facility;
pub mod version;

pub use config::Configuration;
pub use connection::{ConnectionParams, Driver};
pub use errors::{ExError, ExErrorKind, MigrationError, Result};
pub use version::Version;
