//! tallyman engine - discovering and running migrations
//!
//! Coordinates the migration sources (registered units and files on disk)
//! with the applied-version store.

pub mod loader;
pub mod manager;
pub mod registry;
pub mod script;
pub mod unit;

pub use loader::{Artifact, MigrationLoader};
pub use manager::{MigrationStatus, MigrationsManager};
pub use registry::Registry;
pub use unit::{exec_sql, Migration, SqlStatus, StatementOutcome};
