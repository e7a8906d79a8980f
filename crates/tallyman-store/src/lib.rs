//! tallyman store - connection bootstrap and migration bookkeeping
//!
//! Provides:
//! - Opening a database handle from parsed connection parameters
//! - Bookkeeping-table DDL for each supported dialect
//! - The applied-version store backed by that table

pub mod db;
pub mod ddl;
pub mod errors;
pub mod ledger;

pub use ddl::TableSpec;
pub use errors::Result;
pub use ledger::{AppliedMigration, AppliedVersionStore};
