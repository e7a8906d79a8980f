//! Schema command
//!
//! Usage: tallyman schema
//!
//! Prints the bookkeeping table DDL for the configured database without
//! connecting to it.

use super::GlobalArgs;
use tallyman_core::Driver;
use tallyman_store::TableSpec;

pub fn execute(global: &GlobalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = global.configuration()?;
    let driver = if config.database_url.trim().is_empty() {
        Driver::Sqlite
    } else {
        config.connection_params()?.driver
    };

    let table = TableSpec::from_config(driver, &config)?;
    println!("{};", table.create_table_sql());
    Ok(())
}
